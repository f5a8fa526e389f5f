//! Error types surfaced to the orchestrator.
//!
//! Only the rendered message crosses the wire, so every variant's
//! `Display` is the exact text the caller sees.

/// Failure of an action's `run`, `resume` or `cancel`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Capability absent on this action. Not a transient fault.
    #[error("not supported")]
    NotSupported,
    #[error("Task with id {0} could not be found")]
    TaskNotFound(String),
    /// Business failure, carrying the fully wrapped message.
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }
}

impl From<anyhow::Error> for ActionError {
    /// Renders the whole context chain, outermost first: `outer: inner`.
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(format!("{err:#}"))
    }
}

/// A request that could not be matched against an action's parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("Not enough arguments, expected {expected}, got {got}")]
    Arity { expected: usize, got: usize },
    #[error("Converting argument {position} to {expected}: {message}")]
    Coercion {
        position: usize,
        expected: &'static str,
        message: String,
    },
    #[error("Invalid action signature: {0}")]
    Signature(String),
}
