//! Search configuration parameters.
//!
//! These parameters control the behavior of the risk-constrained UCT
//! variants. All three agents share [`UctConfig`]; the Pareto agent
//! additionally takes [`MixParams`] for its frontier mixing grid.

use cmdp_core::{CmdpError, Result};

/// Configuration shared by the UCT agents.
#[derive(Clone, Debug)]
pub struct UctConfig {
    /// Maximum tree depth reachable during selection. Must be positive.
    pub max_depth: u32,

    /// Number of simulations per decision. Zero is allowed: the agent then
    /// decides from a freshly expanded root.
    pub num_sim: u32,

    /// Upper bound on the expected discounted penalty, in [0, 1].
    pub risk_thd: f32,

    /// Discount factor, in (0, 1].
    pub gamma: f32,

    /// UCB exploration constant, non-negative.
    pub exploration_constant: f32,
}

impl Default for UctConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            num_sim: 100,
            risk_thd: 0.1,
            gamma: 0.99,
            exploration_constant: 5.0,
        }
    }
}

impl UctConfig {
    /// Create a config with the specified simulation budget.
    pub fn with_simulations(num_sim: u32) -> Self {
        Self {
            num_sim,
            ..Default::default()
        }
    }

    /// Create a config with the specified simulation budget and risk bound.
    pub fn with_risk(num_sim: u32, risk_thd: f32) -> Self {
        Self {
            num_sim,
            risk_thd,
            ..Default::default()
        }
    }

    /// Check that every parameter is inside its domain.
    ///
    /// # Errors
    /// Returns `CmdpError::InvalidConfig` naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(CmdpError::InvalidConfig(
                "max_depth must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.risk_thd) {
            return Err(CmdpError::InvalidConfig(format!(
                "risk_thd {} is outside [0, 1]",
                self.risk_thd
            )));
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(CmdpError::InvalidConfig(format!(
                "gamma {} is outside (0, 1]",
                self.gamma
            )));
        }
        if !(self.exploration_constant >= 0.0) {
            return Err(CmdpError::InvalidConfig(format!(
                "exploration_constant {} is negative",
                self.exploration_constant
            )));
        }
        Ok(())
    }
}

/// Grid parameters for the Pareto frontier mixing search.
#[derive(Clone, Copy, Debug)]
pub struct MixParams {
    /// Number of grid steps searched on each side of the risk target.
    pub steps: usize,

    /// Size of one grid step along the risk axis.
    pub step: f32,
}

impl Default for MixParams {
    fn default() -> Self {
        Self {
            steps: 10,
            step: 0.01,
        }
    }
}
