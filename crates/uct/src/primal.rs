//! Primal UCT: constrained UCB1 selection.
//!
//! Selection maximizes UCB over the expected reward restricted to actions
//! whose penalty estimate stays under the current sampling threshold; if no
//! action qualifies, it falls back to the least risky one. Leaves are
//! evaluated with a random rollout through the simulation handler.

use crate::config::UctConfig;
use crate::node::StateId;
use crate::policy::{ucb_bonus, PairStats, TreePolicy};
use crate::tree::SearchTree;
use cmdp_core::{EnvHandler, Environment};
use rand::Rng;
use std::fmt;
use std::hash::Hash;

/// The primal risk-constrained UCT policy.
#[derive(Clone, Debug)]
pub struct PrimalPolicy<R: Rng> {
    risk_thd: f32,
    sample_risk_thd: f32,
    exploration_constant: f32,
    rng: R,
}

impl<R: Rng> PrimalPolicy<R> {
    /// Build the policy from an agent configuration. The rollout evaluation
    /// draws actions from `rng`.
    pub fn new(config: &UctConfig, rng: R) -> Self {
        Self {
            risk_thd: config.risk_thd,
            sample_risk_thd: config.risk_thd,
            exploration_constant: config.exploration_constant,
            rng,
        }
    }

    /// The risk threshold currently applied to selection.
    pub fn sample_risk_thd(&self) -> f32 {
        self.sample_risk_thd
    }
}

impl<S, A, R> TreePolicy<S, A> for PrimalPolicy<R>
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Copy + Eq + fmt::Debug,
    R: Rng,
{
    type V = PairStats;
    type Q = PairStats;

    fn name(&self) -> &'static str {
        "primal_uct"
    }

    fn begin_simulation(&mut self) {
        self.sample_risk_thd = self.risk_thd;
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

        let mut best: Option<usize> = None;
        let mut best_score = f32::NEG_INFINITY;
        for (i, aid) in node.children.iter().enumerate() {
            let child = tree.action(*aid);
            if child.q.mean_penalty() > self.sample_risk_thd {
                continue;
            }
            let mut score = child.q.mean_reward();
            if explore {
                score += ucb_bonus(self.exploration_constant, node.num_visits, child.num_visits);
            }
            if score > best_score {
                best_score = score;
                best = Some(i);
            }
        }
        if let Some(i) = best {
            return i;
        }

        // No admissible action: take the least risky one, preferring higher
        // reward on ties, then enumeration order.
        let mut fallback = 0;
        let mut fallback_penalty = f32::INFINITY;
        let mut fallback_reward = f32::NEG_INFINITY;
        for (i, aid) in node.children.iter().enumerate() {
            let q = &tree.action(*aid).q;
            let penalty = q.mean_penalty();
            let reward = q.mean_reward();
            if penalty < fallback_penalty
                || (penalty == fallback_penalty && reward > fallback_reward)
            {
                fallback = i;
                fallback_penalty = penalty;
                fallback_reward = reward;
            }
        }
        fallback
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

    /// Random rollout from the leaf state, folding the discounted return
    /// into the leaf value.
    fn evaluate<E>(
        &mut self,
        tree: &mut SearchTree<S, A, PairStats, PairStats>,
        leaf: StateId,
        handler: &mut EnvHandler<E>,
    ) where
        E: Environment<State = S, Action = A>,
    {
        if tree.state(leaf).terminal {
            return;
        }
        let gamma = tree.gamma();
        let budget = tree.max_depth().saturating_sub(tree.state(leaf).depth);

        let mut disc_r = 0.0f32;
        let mut disc_p = 0.0f32;
        let mut discount = 1.0f32;
        for _ in 0..budget {
            let actions = handler.possible_actions();
            if actions.is_empty() {
                break;
            }
            let action = actions[self.rng.gen_range(0..actions.len())];
            let outcome = handler.sim_action(action);
            disc_r += discount * outcome.reward;
            disc_p += discount * outcome.penalty;
            discount *= gamma;
            if outcome.done {
                break;
            }
        }
        tree.state_mut(leaf).v.add(disc_r, disc_p);
    }

    fn reset(&mut self) {
        self.sample_risk_thd = self.risk_thd;
    }
}
