//! Pareto UCT: explicit frontier tracking with randomized selection.
//!
//! Every node carries an approximate reward-versus-risk frontier. Selection
//! scores all unordered pairs of children through [`mix`] against the
//! current risk target and randomizes between the winning pair's two
//! endpoints; the descent callback then redistributes the risk target to
//! the realized child by matching frontier slopes.

use crate::config::{MixParams, UctConfig};
use crate::curve::{mix, ParetoCurve};
use crate::node::{ActionId, StateId};
use crate::policy::{ucb_bonus, TreePolicy};
use crate::tree::SearchTree;
use rand::Rng;
use std::fmt;
use std::hash::Hash;

/// Frontier payload shared by state and action nodes.
#[derive(Clone, Debug, Default)]
pub struct ParetoValue {
    /// Frontier estimate.
    pub curve: ParetoCurve,

    /// Risk target assigned to this node on the last descent through it.
    pub risk_thd: f32,
}

/// The Pareto-frontier UCT policy.
#[derive(Clone, Debug)]
pub struct ParetoPolicy<R: Rng> {
    risk_thd: f32,
    sample_risk_thd: f32,
    exploration_constant: f32,
    mix_params: MixParams,
    rng: R,
}

impl<R: Rng> ParetoPolicy<R> {
    /// Build the policy from an agent configuration. Selection draws its
    /// mixing variates from `rng`.
    pub fn new(config: &UctConfig, mix_params: MixParams, rng: R) -> Self {
        Self {
            risk_thd: config.risk_thd,
            sample_risk_thd: config.risk_thd,
            exploration_constant: config.exploration_constant,
            mix_params,
            rng,
        }
    }

    /// The risk target currently carried along the descent path.
    pub fn sample_risk_thd(&self) -> f32 {
        self.sample_risk_thd
    }
}

impl<S, A, R> TreePolicy<S, A> for ParetoPolicy<R>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Copy + Eq + fmt::Debug,
    R: Rng,
{
    type V = ParetoValue;
    type Q = ParetoValue;

    fn name(&self) -> &'static str {
        "pareto_uct"
    }

    fn begin_simulation(&mut self) {
        self.sample_risk_thd = self.risk_thd;
    }

    fn select_action(
        &mut self,
        tree: &SearchTree<S, A, ParetoValue, ParetoValue>,
        sid: StateId,
        explore: bool,
    ) -> usize {
        let node = tree.state(sid);
        assert!(
            !node.children.is_empty(),
            "BUG: select_action called on a leaf"
        );
        let target = self.sample_risk_thd;

        // Reward bounds across children scale the exploration bonus; widen
        // degenerate bounds so fresh nodes still explore.
        let mut min_r = f32::INFINITY;
        let mut max_r = f32::NEG_INFINITY;
        for aid in &node.children {
            let (lo, hi) = tree.action(*aid).q.curve.r_bounds();
            min_r = min_r.min(lo);
            max_r = max_r.max(hi);
        }
        if min_r >= max_r {
            if min_r < 0.0 {
                max_r = 0.9 * min_r;
            } else if min_r > 0.0 {
                max_r = 1.1 * min_r;
            } else {
                max_r = 1.0;
            }
        }
        let range = max_r - min_r;

        let bonus: Vec<f32> = node
            .children
            .iter()
            .map(|aid| {
                if explore {
                    range * ucb_bonus(
                        self.exploration_constant,
                        node.num_visits,
                        tree.action(*aid).num_visits,
                    )
                } else {
                    0.0
                }
            })
            .collect();

        // Score every unordered pair; a single child mixes with itself.
        let mut best_i = 0;
        let mut best_j = 0;
        let mut best = mix(
            &tree.action(node.children[0]).q.curve,
            &tree.action(node.children[0]).q.curve,
            bonus[0],
            bonus[0],
            self.mix_params.steps,
            self.mix_params.step,
            target,
        );
        for i in 0..node.children.len() {
            for j in (i + 1)..node.children.len() {
                let m = mix(
                    &tree.action(node.children[i]).q.curve,
                    &tree.action(node.children[j]).q.curve,
                    bonus[i],
                    bonus[j],
                    self.mix_params.steps,
                    self.mix_params.step,
                    target,
                );
                if m.value > best.value {
                    best = m;
                    best_i = i;
                    best_j = j;
                }
            }
        }

        let (idx, risk) = if self.rng.gen::<f32>() < best.weight_a {
            (best_i, best.risk_a)
        } else {
            (best_j, best.risk_b)
        };
        self.sample_risk_thd = risk.clamp(0.0, 1.0);
        idx
    }

    /// Redistribute the risk target to the realized child by matching the
    /// action frontier's slope on the child frontier.
    fn descend_update(
        &mut self,
        tree: &mut SearchTree<S, A, ParetoValue, ParetoValue>,
        aid: ActionId,
        child: StateId,
        _explore: bool,
    ) {
        let target = self.sample_risk_thd;
        tree.action_mut(aid).q.risk_thd = target;
        let d = tree.action(aid).q.curve.derivative(target);
        let new_target = tree
            .state(child)
            .v
            .curve
            .inverse_derivative(d)
            .clamp(0.0, 1.0);
        tree.state_mut(child).v.risk_thd = new_target;
        self.sample_risk_thd = new_target;
    }

    /// Frontier read-out at the node's assigned risk target.
    fn value_estimate(&self, v: &ParetoValue) -> (f32, f32) {
        let (lo, hi) = v.curve.risk_bounds();
        let risk = v.risk_thd.clamp(lo, hi);
        (v.curve.value_at(risk), risk)
    }

    fn propagate_v(&mut self, v: &mut ParetoValue, disc_r: f32, disc_p: f32) {
        v.curve.update(disc_r, disc_p);
    }

    fn propagate_q(&mut self, q: &mut ParetoValue, disc_r: f32, disc_p: f32) {
        q.curve.update(disc_r, disc_p);
    }

    fn reset(&mut self) {
        self.sample_risk_thd = self.risk_thd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn policy(risk_thd: f32, seed: u64) -> ParetoPolicy<ChaCha8Rng> {
        let config = UctConfig {
            risk_thd,
            exploration_constant: 0.0,
            ..Default::default()
        };
        ParetoPolicy::new(&config, MixParams::default(), ChaCha8Rng::seed_from_u64(seed))
    }

    /// Root with two action children carrying single-point frontiers.
    fn two_arm_tree(
        safe: (f32, f32),
        risky: (f32, f32),
    ) -> SearchTree<u8, u8, ParetoValue, ParetoValue> {
        let mut tree: SearchTree<u8, u8, ParetoValue, ParetoValue> =
            SearchTree::new(0u8, 1.0, 10);
        tree.expand(tree.root(), vec![0u8, 1]).unwrap();
        let children = tree.state(tree.root()).children.clone();
        tree.action_mut(children[0]).q.curve.update(safe.0, safe.1);
        tree.action_mut(children[1]).q.curve.update(risky.0, risky.1);
        tree.state_mut(tree.root()).num_visits = 2;
        tree
    }

    #[test]
    fn test_selection_sets_sample_risk() {
        let tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
        let mut policy = policy(0.2, 3);

        let idx = policy.select_action(&tree, tree.root(), false);
        let thd = policy.sample_risk_thd();
        // Whichever endpoint the Bernoulli picked, the target matches it.
        if idx == 0 {
            assert!((thd - 0.0).abs() < 1e-6);
        } else {
            assert_eq!(idx, 1);
            assert!((thd - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_selection_frequency_tracks_mixture_weight() {
        // At target 0.2 the optimal mixture puts weight 0.8 on the safe arm.
        let mut safe_picks = 0;
        for seed in 0..200 {
            let tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
            let mut policy = policy(0.2, seed);
            if policy.select_action(&tree, tree.root(), false) == 0 {
                safe_picks += 1;
            }
        }
        assert!(
            (120..=195).contains(&safe_picks),
            "safe picked {safe_picks}/200 times"
        );
    }

    #[test]
    fn test_vacuous_target_always_risky() {
        for seed in 0..20 {
            let tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
            let mut policy = policy(1.0, seed);
            assert_eq!(policy.select_action(&tree, tree.root(), false), 1);
        }
    }

    #[test]
    fn test_zero_target_always_safe() {
        for seed in 0..20 {
            let tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
            let mut policy = policy(0.0, seed);
            assert_eq!(policy.select_action(&tree, tree.root(), false), 0);
        }
    }

    #[test]
    fn test_selection_on_fresh_node_is_well_defined() {
        let mut tree: SearchTree<u8, u8, ParetoValue, ParetoValue> =
            SearchTree::new(0u8, 1.0, 10);
        tree.expand(tree.root(), vec![0u8, 1, 2]).unwrap();
        let mut policy = policy(0.5, 11);

        let idx = policy.select_action(&tree, tree.root(), true);
        assert!(idx < 3);
        let thd = policy.sample_risk_thd();
        assert!((0.0..=1.0).contains(&thd));
    }

    #[test]
    fn test_descend_update_retargets_risk() {
        let mut tree = two_arm_tree((1.0, 0.0), (3.0, 1.0));
        let aid = tree.state(tree.root()).children[1];
        let child = {
            let outcome = cmdp_core::Outcome {
                state: 5u8,
                reward: 3.0,
                penalty: 1.0,
                done: true,
            };
            tree.add_outcome(aid, &outcome)
        };
        let mut policy = policy(0.2, 5);
        policy.sample_risk_thd = 1.0;

        policy.descend_update(&mut tree, aid, child, true);

        assert!((tree.action(aid).q.risk_thd - 1.0).abs() < 1e-6);
        // The child frontier is empty, so the target collapses to zero.
        assert_eq!(tree.state(child).v.risk_thd, 0.0);
        assert_eq!(policy.sample_risk_thd(), 0.0);
    }
}
