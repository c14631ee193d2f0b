use thiserror::Error;

/// Errors that can occur in the planning system
#[derive(Error, Debug)]
pub enum CmdpError {
    #[error("Action set is empty in a non-terminal state")]
    EmptyActionSet,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Episode is already over")]
    EpisodeOver,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience Result type for planning operations
pub type Result<T> = std::result::Result<T, CmdpError>;
