//! Command-line front-end.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use flashloop_agent_core::{Agent, LoopConfig, LoopStatus, StdinGate};
use flashloop_planner::{CerebrasPlanner, ProviderConfig};
use tracing::info;

use crate::config::EnvConfig;

/// Drive a browser toward a goal and record a replayable Playwright script.
#[derive(Debug, Parser)]
#[command(name = "flash-loop", version, about)]
pub struct Cli {
    /// Natural-language goal, e.g. "log in as demo@example.com"
    pub goal: String,

    /// URL to open first
    #[arg(short = 'u', long = "url")]
    pub url: Option<String>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Confirm every action before it runs
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Maximum observe-think-act iterations
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_steps: u32,
}

/// Run the CLI to completion. `Ok(true)` means the goal was reached.
pub async fn run(cli: Cli) -> Result<bool> {
    let env = EnvConfig::from_env()?;
    info!(model = %env.model, "starting");

    let planner = CerebrasPlanner::new(ProviderConfig::new(env.api_key).with_model(env.model))
        .context("planner construction failed")?;

    let mut config = LoopConfig::default()
        .max_steps(cli.max_steps)
        .interactive(cli.interactive)
        .headless(cli.headless);
    if let Some(url) = cli.url {
        config = config.start_url(url);
    }

    let mut agent = Agent::new(config, Arc::new(planner));
    if cli.interactive {
        agent = agent.with_gate(Arc::new(StdinGate));
    }

    let result = agent.run_owned(&cli.goal).await?;

    println!();
    println!("Status:  {:?}", result.status);
    println!("Steps:   {}", result.steps_taken);
    println!("Message: {}", result.message);
    println!("Script:  {}", result.script);

    Ok(result.status == LoopStatus::Completed)
}
