//! Stateful adapter between agents and environments.
//!
//! The handler distinguishes *real* plays, which advance the episode and the
//! reward/penalty/step counters, from *simulated* plays, which run off a
//! checkpoint and leave the real episode untouched.

use crate::env::{Environment, Outcome};
use tracing::debug;

/// Wraps an environment with checkpoint-based simulation sessions.
///
/// The first `sim_action` after a real play takes a checkpoint and opens a
/// simulation session; all further `sim_action` calls play inside it. The
/// session ends on `sim_reset` or implicitly on the next `play_action`,
/// which restores the checkpoint before committing the real step.
#[derive(Clone, Debug)]
pub struct EnvHandler<E: Environment> {
    env: E,
    simulating: bool,
    reward: f32,
    penalty: f32,
    num_steps: u32,
}

impl<E: Environment> EnvHandler<E> {
    /// Wrap an environment. The environment is reset to its episode start.
    pub fn new(mut env: E) -> Self {
        env.reset();
        Self {
            env,
            simulating: false,
            reward: 0.0,
            penalty: 0.0,
            num_steps: 0,
        }
    }

    /// Accumulated real reward this episode.
    pub fn reward(&self) -> f32 {
        self.reward
    }

    /// Accumulated real penalty this episode.
    pub fn penalty(&self) -> f32 {
        self.penalty
    }

    /// Number of real steps taken this episode.
    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    /// Zero the reward/penalty/step counters.
    pub fn reset(&mut self) {
        debug!("resetting handler");
        self.reward = 0.0;
        self.penalty = 0.0;
        self.num_steps = 0;
    }

    /// Commit an action to the real environment.
    ///
    /// If a simulation session is active, the checkpoint is restored and the
    /// session ends before the action is played.
    pub fn play_action(&mut self, action: E::Action) -> Outcome<E::State> {
        if self.simulating {
            self.env.restore_checkpoint();
            self.simulating = false;
        }
        let outcome = self.env.play_action(action);
        self.num_steps += 1;
        self.reward += outcome.reward;
        self.penalty += outcome.penalty;
        outcome
    }

    /// Play an action inside a simulation session.
    ///
    /// Takes a checkpoint first if no session is active. Real counters are
    /// not touched.
    pub fn sim_action(&mut self, action: E::Action) -> Outcome<E::State> {
        if !self.simulating {
            self.env.make_checkpoint();
            self.simulating = true;
        }
        self.env.play_action(action)
    }

    /// Restore the checkpoint and end the session if one is active.
    ///
    /// Idempotent: calling with no active session does nothing.
    pub fn sim_reset(&mut self) {
        if self.simulating {
            self.env.restore_checkpoint();
            self.simulating = false;
        }
    }

    /// Whether a simulation session is currently active.
    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    /// Number of possible actions.
    pub fn num_actions(&self) -> usize {
        self.env.num_actions()
    }

    /// All possible actions, in enumeration order.
    pub fn possible_actions(&self) -> Vec<E::Action> {
        self.env.possible_actions()
    }

    /// The `i`-th action of the enumeration.
    pub fn get_action(&self, i: usize) -> E::Action {
        self.env.get_action(i)
    }

    /// Current state of the wrapped environment.
    pub fn current_state(&self) -> E::State {
        self.env.current_state()
    }

    /// Whether the real episode has ended.
    pub fn is_over(&self) -> bool {
        self.env.is_over()
    }

    /// The wrapped environment.
    pub fn env(&self) -> &E {
        &self.env
    }
}
