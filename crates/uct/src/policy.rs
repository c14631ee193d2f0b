//! Policy plug-in points for the tree search skeleton.
//!
//! A [`TreePolicy`] supplies the four extension points that differentiate
//! the UCT variants — action selection, the descent callback, and the two
//! propagation updates — plus the simulation lifecycle hooks. Dispatch is
//! static: each agent is monomorphized over its policy.

use crate::node::{ActionId, StateId};
use crate::tree::SearchTree;
use cmdp_core::{EnvHandler, Environment};
use std::fmt;
use std::hash::Hash;

/// Denominator guard in the UCB exploration bonus.
pub(crate) const UCB_EPS: f32 = 1e-4;

/// Standard UCB exploration bonus `c · √(ln(N+1) / (n + ε))`.
pub(crate) fn ucb_bonus(c: f32, parent_visits: u32, child_visits: u32) -> f32 {
    c * (((parent_visits + 1) as f32).ln() / (child_visits as f32 + UCB_EPS)).sqrt()
}

/// Running mean of a (reward, penalty) pair.
///
/// The value payload of the primal and dual policies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairStats {
    /// Sum of discounted reward samples.
    pub reward_sum: f32,

    /// Sum of discounted penalty samples.
    pub penalty_sum: f32,

    /// Number of samples.
    pub count: u32,
}

impl PairStats {
    /// Fold in one sample.
    pub fn add(&mut self, reward: f32, penalty: f32) {
        self.reward_sum += reward;
        self.penalty_sum += penalty;
        self.count += 1;
    }

    /// Mean reward, 0 for an empty payload.
    pub fn mean_reward(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.reward_sum / self.count as f32
        }
    }

    /// Mean penalty, 0 for an empty payload.
    pub fn mean_penalty(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.penalty_sum / self.count as f32
        }
    }
}

/// Behavior that differentiates one UCT variant from another.
///
/// The skeleton calls these hooks in a fixed order per simulation:
/// `begin_simulation`, then `select_action` / `descend_update` along the
/// descent, `evaluate` at the leaf, `propagate_v` / `propagate_q` on the
/// walk back to the root, and finally `after_simulation`.
pub trait TreePolicy<S, A>: Sized
where
    S: Clone + Eq + Hash + fmt::Debug,
    A: Copy + Eq + fmt::Debug,
{
    /// State value payload.
    type V: Clone + Default + fmt::Debug;

    /// Action value payload.
    type Q: Clone + Default + fmt::Debug;

    /// Name of the agent this policy defines.
    fn name(&self) -> &'static str;

    /// Called before every simulation and before the final greedy selection.
    fn begin_simulation(&mut self) {}

    /// Pick a child action of `sid`, returned as an index into the node's
    /// enumeration-ordered children.
    ///
    /// With `explore` set the policy adds its exploration bonus; without it
    /// the choice is greedy. Only called on expanded nodes.
    fn select_action(
        &mut self,
        tree: &SearchTree<S, A, Self::V, Self::Q>,
        sid: StateId,
        explore: bool,
    ) -> usize;

    /// Called after each descent step, simulated or real, once the realized
    /// child state is known.
    fn descend_update(
        &mut self,
        _tree: &mut SearchTree<S, A, Self::V, Self::Q>,
        _aid: ActionId,
        _child: StateId,
        _explore: bool,
    ) {
    }

    /// Scalar (reward, penalty) view of a state value payload, used by the
    /// propagation formulas.
    fn value_estimate(&self, v: &Self::V) -> (f32, f32);

    /// Fold a discounted (reward, penalty) sample into a state value.
    fn propagate_v(&mut self, v: &mut Self::V, disc_r: f32, disc_p: f32);

    /// Fold a discounted (reward, penalty) sample into an action value.
    fn propagate_q(&mut self, q: &mut Self::Q, disc_r: f32, disc_p: f32);

    /// Evaluate a freshly expanded leaf.
    ///
    /// Runs between expansion and propagation, with the simulation session
    /// still positioned at the leaf state. The default is the void
    /// evaluation.
    fn evaluate<E>(
        &mut self,
        _tree: &mut SearchTree<S, A, Self::V, Self::Q>,
        _leaf: StateId,
        _handler: &mut EnvHandler<E>,
    ) where
        E: Environment<State = S, Action = A>,
    {
    }

    /// Called after every completed simulation pass.
    fn after_simulation(&mut self, _tree: &SearchTree<S, A, Self::V, Self::Q>) {}

    /// Restore initial policy parameters for a fresh episode.
    fn reset(&mut self);
}
