//! Planning: one LLM call per step, structured output, stateless between
//! calls.

pub mod mock;
pub mod prompt;
pub mod provider;

use async_trait::async_trait;
use flashloop_core_types::ActionPlan;
use thiserror::Error;

pub use mock::ScriptedPlanner;
pub use provider::{CerebrasPlanner, ProviderConfig};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("LLM request failed: {0}")]
    Transport(String),

    /// The model's output did not decode into an action plan. Retryable:
    /// the guidance is fed back so the next attempt can self-correct.
    #[error("could not parse planner output: {0}. Return a single JSON object matching the schema.")]
    Parse(String),

    #[error("planner configuration error: {0}")]
    Config(String),
}

/// Everything the planner sees for one step.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub goal: String,
    /// Symbolic page state, dialog banner already prepended when one is
    /// pending.
    pub state_text: String,
    /// Most recent history entries, oldest first, at most five.
    pub history: Vec<String>,
    /// Translated error from the previous step, if it failed.
    pub last_error: Option<String>,
}

/// Abstraction over LLM-backed planners so vendors can be swapped and tests
/// can run without a network.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> Result<ActionPlan, PlannerError>;
}
