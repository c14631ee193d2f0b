use crate::error::Result;

/// A sequential decision-making agent.
///
/// Agents advance the episode one real step per `play` call; an external
/// driver owns the `reset` / `play` / `train` loop. Planning agents in this
/// family are not trainable and keep the default `train` no-op.
pub trait Agent {
    /// Advance the episode by one real step.
    ///
    /// # Errors
    /// Fails if the episode is already over or the environment offers no
    /// actions in a non-terminal state.
    fn play(&mut self) -> Result<()>;

    /// Restore the initial agent state, including the handler counters.
    fn reset(&mut self);

    /// Post-episode training hook.
    fn train(&mut self) {}

    /// Whether `train` does anything for this agent.
    fn is_trainable(&self) -> bool {
        false
    }

    /// The name of the agent.
    fn name(&self) -> &str;
}
