//! Tree node types.
//!
//! The tree alternates between state nodes and action nodes. Both live in
//! slab arenas and reference each other through index handles, which keeps
//! parent back-references non-owning and makes subtree destruction on
//! descent a plain index walk.

use std::hash::Hash;

/// Handle to a state node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateId(pub(crate) usize);

/// Handle to an action node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionId(pub(crate) usize);

/// Running means over realized outcomes.
///
/// Tracks the expected immediate reward and penalty together with the mean
/// of the Bernoulli episode-termination flag.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutcomeStats {
    /// Mean immediate reward.
    pub reward: f32,

    /// Mean immediate penalty.
    pub penalty: f32,

    /// Mean of the termination flag.
    pub terminality: f32,

    /// Number of recorded outcomes.
    pub samples: u32,
}

impl OutcomeStats {
    /// Fold one realized outcome into the running means.
    pub fn record(&mut self, reward: f32, penalty: f32, done: bool) {
        self.samples += 1;
        let n = self.samples as f32;
        self.reward += (reward - self.reward) / n;
        self.penalty += (penalty - self.penalty) / n;
        self.terminality += (if done { 1.0 } else { 0.0 } - self.terminality) / n;
    }
}

/// A visited game state.
///
/// Owns one action child per enumerated action, in the environment's
/// enumeration order. `observed` holds the running means of the immediate
/// reward and penalty collected on entry to this state; propagation reads
/// them as the edge observation from the parent action.
#[derive(Clone, Debug)]
pub struct StateNode<S, A, V> {
    /// The world state.
    pub state: S,

    /// Owning action node, `None` for the root.
    pub parent: Option<ActionId>,

    /// Actions, parallel to `children`.
    pub actions: Vec<A>,

    /// Action children, one per enumerated action.
    pub children: Vec<ActionId>,

    /// Number of simulation passes through this node.
    pub num_visits: u32,

    /// Policy-specific state value payload.
    pub v: V,

    /// Whether the environment reported the episode over in this state.
    pub terminal: bool,

    /// Distance from the root at expansion time.
    pub depth: u32,

    /// Entry-edge outcome statistics.
    pub observed: OutcomeStats,
}

impl<S, A, V> StateNode<S, A, V> {
    /// Whether the node has not been expanded yet.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl<S, A: Copy + Eq, V> StateNode<S, A, V> {
    /// Index of `action` in the enumeration order, if present.
    pub fn action_index(&self, action: A) -> Option<usize> {
        self.actions.iter().position(|a| *a == action)
    }
}

/// An action edge out of a state node.
///
/// Owns the state nodes realized by playing the action, keyed by state. The
/// child list is an ordered association list rather than a hash map so that
/// iteration order is a function of insertion order alone.
#[derive(Clone, Debug)]
pub struct ActionNode<S, A, Q> {
    /// The action this node represents.
    pub action: A,

    /// State node that owns this action node.
    pub parent: StateId,

    /// Realized child states, keyed by state.
    pub children: Vec<(S, StateId)>,

    /// Number of simulation passes through this node.
    pub num_visits: u32,

    /// Policy-specific action value payload.
    pub q: Q,

    /// Aggregate outcome statistics across all realized plays.
    pub outcome: OutcomeStats,
}

impl<S: Eq + Hash, A, Q> ActionNode<S, A, Q> {
    /// Child state node for `state`, if realized before.
    pub fn child(&self, state: &S) -> Option<StateId> {
        self.children
            .iter()
            .find(|(s, _)| s == state)
            .map(|(_, id)| *id)
    }
}
