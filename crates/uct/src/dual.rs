//! Dual UCT: Lagrangian relaxation of the risk constraint.
//!
//! The constraint is folded into the objective as `reward − λ · penalty`
//! and λ follows a projected subgradient ascent at the root: after every
//! simulation the multiplier moves by `lr · (penalty(a*) − risk_thd)` for
//! the current greedy action `a*`, clamped at zero.

use crate::config::UctConfig;
use crate::node::StateId;
use crate::policy::{ucb_bonus, PairStats, TreePolicy};
use crate::tree::SearchTree;
use cmdp_core::{CmdpError, Result};
use std::fmt;
use std::hash::Hash;

/// The dual (Lagrangian) UCT policy.
#[derive(Clone, Debug)]
pub struct DualPolicy {
    risk_thd: f32,
    lambda: f32,
    lr: f32,
    exploration_constant: f32,
}

impl DualPolicy {
    /// Build the policy from an agent configuration and a learning rate.
    ///
    /// # Errors
    /// Returns `CmdpError::InvalidConfig` if `lr` is not positive.
    pub fn new(config: &UctConfig, lr: f32) -> Result<Self> {
        if !(lr > 0.0) {
            return Err(CmdpError::InvalidConfig(format!(
                "lr {lr} must be positive"
            )));
        }
        Ok(Self {
            risk_thd: config.risk_thd,
            lambda: 0.0,
            lr,
            exploration_constant: config.exploration_constant,
        })
    }

    /// Current value of the Lagrange multiplier.
    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    /// Scalarized score of one action payload.
    fn score(&self, q: &PairStats) -> f32 {
        q.mean_reward() - self.lambda * q.mean_penalty()
    }
}

impl<S, A> TreePolicy<S, A> for DualPolicy
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Copy + Eq + fmt::Debug,
{
    type V = PairStats;
    type Q = PairStats;

    fn name(&self) -> &'static str {
        "dual_uct"
    }

    fn select_action(
        &mut self,
        tree: &SearchTree<S, A, PairStats, PairStats>,
        sid: StateId,
        explore: bool,
    ) -> usize {
        let node = tree.state(sid);
        assert!(
            !node.children.is_empty(),
            "BUG: select_action called on a leaf"
        );

        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for (i, aid) in node.children.iter().enumerate() {
            let child = tree.action(*aid);
            let mut score = self.score(&child.q);
            if explore {
                score += ucb_bonus(self.exploration_constant, node.num_visits, child.num_visits);
            }
            if score > best_score {
                best_score = score;
                best = i;
            }
        }
        best
    }

    fn value_estimate(&self, v: &PairStats) -> (f32, f32) {
        (v.mean_reward(), v.mean_penalty())
    }

    fn propagate_v(&mut self, v: &mut PairStats, disc_r: f32, disc_p: f32) {
        v.add(disc_r, disc_p);
    }

    fn propagate_q(&mut self, q: &mut PairStats, disc_r: f32, disc_p: f32) {
        q.add(disc_r, disc_p);
    }

    /// One projected subgradient step on λ, driven by the greedy action's
    /// penalty estimate at the root.
    fn after_simulation(&mut self, tree: &SearchTree<S, A, PairStats, PairStats>) {
        let root = tree.root();
        if tree.state(root).children.is_empty() {
            return;
        }
        let idx = self.select_action(tree, root, false);
        let aid = tree.state(root).children[idx];
        let penalty = tree.action(aid).q.mean_penalty();
        self.lambda = (self.lambda + self.lr * (penalty - self.risk_thd)).max(0.0);
    }

    fn reset(&mut self) {
        self.lambda = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(risk_thd: f32, lr: f32) -> DualPolicy {
        let config = UctConfig {
            risk_thd,
            exploration_constant: 0.0,
            ..Default::default()
        };
        DualPolicy::new(&config, lr).unwrap()
    }

    fn two_arm_tree(
        safe: (f32, f32),
        risky: (f32, f32),
    ) -> SearchTree<u8, u8, PairStats, PairStats> {
        let mut tree: SearchTree<u8, u8, PairStats, PairStats> = SearchTree::new(0u8, 1.0, 10);
        tree.expand(tree.root(), vec![0u8, 1]).unwrap();
        let children = tree.state(tree.root()).children.clone();
        tree.action_mut(children[0]).q.add(safe.0, safe.1);
        tree.action_mut(children[1]).q.add(risky.0, risky.1);
        tree.state_mut(tree.root()).num_visits = 2;
        tree
    }

    #[test]
    fn test_rejects_non_positive_lr() {
        let config = UctConfig::default();
        assert!(DualPolicy::new(&config, 0.0).is_err());
        assert!(DualPolicy::new(&config, -0.1).is_err());
    }

    #[test]
    fn test_selection_at_zero_lambda_is_reward_greedy() {
        let tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
        let mut policy = policy(0.2, 0.1);

        let idx = TreePolicy::<u8, u8>::select_action(&mut policy, &tree, tree.root(), false);
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_large_lambda_flips_selection() {
        let tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
        let mut policy = policy(0.2, 0.1);
        policy.lambda = 2.5;

        // 3 − 2.5·1 = 0.5 < 1 − 2.5·0 = 1.
        let idx = TreePolicy::<u8, u8>::select_action(&mut policy, &tree, tree.root(), false);
        assert_eq!(idx, 0);
    }

    #[test]
    fn test_multiplier_ascends_while_greedy_is_risky() {
        let tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
        let mut policy = policy(0.2, 0.1);

        TreePolicy::<u8, u8>::after_simulation(&mut policy, &tree);
        // Greedy arm has penalty 1: λ ← 0 + 0.1 · (1 − 0.2).
        assert!((policy.lambda() - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_multiplier_projected_at_zero() {
        let tree = two_arm_tree((3.0, 0.0), (1.0, 1.0));
        let mut policy = policy(0.2, 0.1);

        // Greedy arm is penalty-free, so the step is negative and projected.
        TreePolicy::<u8, u8>::after_simulation(&mut policy, &tree);
        assert_eq!(policy.lambda(), 0.0);
    }

    #[test]
    fn test_reset_clears_multiplier() {
        let mut policy = policy(0.2, 0.1);
        policy.lambda = 4.0;
        TreePolicy::<u8, u8>::reset(&mut policy);
        assert_eq!(policy.lambda(), 0.0);
    }
}
