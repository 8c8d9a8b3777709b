//! Errors emitted by the agent core.

use thiserror::Error;

/// System-level failures: these terminate the agent after cleanup, unlike
/// per-step driver errors which feed back into planning.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("context error: {0}")]
    Context(String),

    #[error("observation error: {0}")]
    Observer(String),

    #[error("planner error: {0}")]
    Planner(String),

    #[error("script emitter error: {0}")]
    Emitter(String),
}

impl From<flashloop_browser_context::ContextError> for AgentError {
    fn from(err: flashloop_browser_context::ContextError) -> Self {
        Self::Context(err.to_string())
    }
}

impl From<flashloop_observer::ObserverError> for AgentError {
    fn from(err: flashloop_observer::ObserverError) -> Self {
        Self::Observer(err.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        Self::Emitter(err.to_string())
    }
}
