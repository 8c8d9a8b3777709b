//! flash-loop: an autonomous web agent that drives a browser toward a
//! natural-language goal and records the successful path as a Playwright
//! test.
//!
//! Use the `flash-loop` binary for standalone runs, or [`agent`] to host the
//! loop on a page you already own (e.g. inside a test fixture).

pub mod cli;
pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use flashloop_agent_core::{Agent, LoopConfig};
use flashloop_planner::{CerebrasPlanner, ProviderConfig};

pub use flashloop_agent_core::{LoopResult, LoopStatus};
pub use flashloop_core_types::{ActionPlan, ActionType, ExecutionResult};

/// Options for the in-process entry point.
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    pub max_steps: Option<u32>,
}

/// Drive an externally owned page toward `goal` and return the recorded
/// script text.
///
/// In CI (`CI=true` without `ALLOW_AI_IN_CI`) this is a no-op that returns
/// an annotation instead of calling the LLM or touching the page.
pub async fn agent(page: Page, goal: &str, options: AgentOptions) -> Result<String> {
    if config::ai_disabled_in_ci() {
        return Ok(
            "// flash-loop: AI agent skipped in CI (set ALLOW_AI_IN_CI=1 to enable)\n".to_string(),
        );
    }

    let env = config::EnvConfig::from_env()?;
    let planner = CerebrasPlanner::new(
        ProviderConfig::new(env.api_key).with_model(env.model),
    )
    .context("planner construction failed")?;

    let mut loop_config = LoopConfig::default();
    if let Some(max_steps) = options.max_steps {
        loop_config.max_steps = max_steps;
    }

    let result = Agent::new(loop_config, Arc::new(planner))
        .run_hosted(page, goal)
        .await
        .context("agent run failed")?;
    Ok(result.script)
}
