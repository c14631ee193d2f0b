use std::fmt;
use std::hash::Hash;

/// Result of playing one action in an environment.
///
/// Every transition yields a scalar reward and a scalar penalty. The penalty
/// is the risk signal (e.g. the probability of a safety violation incurred
/// by the step); constrained policies bound its expected discounted sum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome<S> {
    /// State the environment moved to.
    pub state: S,

    /// Immediate reward.
    pub reward: f32,

    /// Immediate penalty (risk signal).
    pub penalty: f32,

    /// Whether the episode ended with this step.
    pub done: bool,
}

/// A constrained decision environment.
///
/// This trait defines the interface any environment must implement to be
/// searchable by the UCT agents. It is designed to be domain-agnostic: the
/// only requirements on states and actions are equality, hashing (states key
/// tree children), and cheap copying.
///
/// # Checkpoints
///
/// `make_checkpoint` / `restore_checkpoint` must capture and restore *all*
/// state relevant to subsequent outcomes, including any internal randomness
/// the environment carries. At most one checkpoint is outstanding at a time;
/// nested checkpoints are not supported.
pub trait Environment {
    /// The world state. Hashed and compared when keying realized outcomes.
    type State: Clone + Eq + Hash + fmt::Debug;

    /// An action. Enumeration order is the canonical child order in the tree.
    type Action: Copy + Eq + fmt::Debug;

    /// Human-readable environment name.
    fn name(&self) -> &str;

    /// Number of possible actions.
    fn num_actions(&self) -> usize;

    /// All possible actions, in enumeration order.
    fn possible_actions(&self) -> Vec<Self::Action>;

    /// The `i`-th action of the enumeration.
    fn get_action(&self, i: usize) -> Self::Action;

    /// Current state of the environment.
    fn current_state(&self) -> Self::State;

    /// Whether the episode has ended.
    fn is_over(&self) -> bool;

    /// Play an action, returning the realized transition.
    fn play_action(&mut self, action: Self::Action) -> Outcome<Self::State>;

    /// Save the complete environment state.
    fn make_checkpoint(&mut self);

    /// Restore the environment to the last checkpoint.
    fn restore_checkpoint(&mut self);

    /// Return to the episode start.
    fn reset(&mut self);
}
