//! The main loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chromiumoxide::Page;
use flashloop_browser_context::{ContextManager, DialogWatcher, StabilityWaiter};
use flashloop_core_types::{ActionPlan, ActionType, HistoryLog};
use flashloop_executor::Executor;
use flashloop_observer::Observer;
use flashloop_planner::{PlanRequest, Planner, PlannerError};
use serde::Serialize;
use tracing::{info, warn};

use crate::browser::launch_browser;
use crate::emitter::{FileEmitter, MemoryEmitter, ScriptEmitter};
use crate::errors::AgentError;
use crate::gate::{GateDecision, NoopGate, StepGate};

use super::config::LoopConfig;

/// History entries shown to the planner each step.
const HISTORY_WINDOW: usize = 5;

/// Ping cadence while the interactive gate blocks on the operator.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    Completed,
    Failed,
    MaxStepsReached,
    Cancelled,
}

/// Final outcome of a run.
#[derive(Debug, Clone)]
pub struct LoopResult {
    pub status: LoopStatus,
    pub message: String,
    pub steps_taken: u32,
    /// Emitter output: a file path in owned mode, the script text in hosted
    /// mode.
    pub script: String,
    pub total_time_ms: u64,
}

impl LoopResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, LoopStatus::Completed)
    }
}

/// Orchestrates one observe-think-act run over an existing context.
pub struct AgentLoop {
    config: LoopConfig,
    observer: Observer,
    executor: Executor,
    planner: Arc<dyn Planner>,
    gate: Arc<dyn StepGate>,
    cancelled: Arc<AtomicBool>,
}

impl AgentLoop {
    pub fn new(config: LoopConfig, planner: Arc<dyn Planner>, gate: Arc<dyn StepGate>) -> Self {
        let executor = Executor::new(StabilityWaiter::new(config.stability));
        Self {
            config,
            observer: Observer::new(),
            executor,
            planner,
            gate,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag the host can flip to stop the loop at the next step boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Run until finish, failure, cancellation or the step cap. Cleanup (the
    /// emitter's closing scaffold) always happens, even when a system error
    /// bubbles out.
    pub async fn run(
        &self,
        manager: &mut ContextManager,
        emitter: &mut dyn ScriptEmitter,
        goal: &str,
    ) -> Result<LoopResult, AgentError> {
        emitter.init(goal)?;
        let started = Instant::now();

        let outcome = self.run_steps(manager, emitter, goal).await;
        emitter.finish()?;

        let (status, message, steps_taken) = outcome?;
        info!(?status, steps_taken, "loop finished");
        Ok(LoopResult {
            status,
            message,
            steps_taken,
            script: emitter.output(),
            total_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn run_steps(
        &self,
        manager: &mut ContextManager,
        emitter: &mut dyn ScriptEmitter,
        goal: &str,
    ) -> Result<(LoopStatus, String, u32), AgentError> {
        let mut history = HistoryLog::new();
        let mut last_error: Option<String> = None;
        let mut consecutive_failures: u32 = 0;

        for step in 1..=self.config.max_steps {
            if self.cancelled.load(Ordering::SeqCst) {
                return Ok((LoopStatus::Cancelled, "cancelled by host".to_string(), step - 1));
            }

            let page = manager.active_page().await?;
            info!(step, max_steps = self.config.max_steps, "observing");

            // An open dialog pauses page scripting, so the extraction script
            // would hang; observe without evaluating and let the banner steer
            // the planner to handle_dialog.
            let pending_dialog = manager.dialogs().pending();
            let observation = if pending_dialog.is_none() {
                self.observer.observe(&page).await?
            } else {
                let url = page.url().await.ok().flatten().unwrap_or_default();
                flashloop_observer::Observation {
                    state_text: format!(
                        "URL: {url}\nTitle:\n\n(page scripting is paused by an open dialog)"
                    ),
                    catalog: flashloop_observer::Catalog::new(page.clone(), Vec::new()),
                }
            };

            let mut state_text = observation.state_text.clone();
            if let Some(dialog) = &pending_dialog {
                state_text = format!("{}\n\n{state_text}", dialog.banner());
            }

            let request = PlanRequest {
                goal: goal.to_string(),
                state_text,
                history: history.recent(HISTORY_WINDOW),
                last_error: last_error.clone(),
            };

            let plan = match self.planner.plan(&request).await {
                Ok(plan) => plan,
                Err(err @ PlannerError::Parse(_)) => {
                    // Malformed model output is a retryable step failure; the
                    // schema guidance goes back in as the error context.
                    let guidance = err.to_string();
                    warn!(%guidance, "plan rejected");
                    history.add_error("plan", &guidance);
                    last_error = Some(guidance);
                    consecutive_failures += 1;
                    observation.catalog.release().await;
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        return Ok((
                            LoopStatus::Failed,
                            format!("{consecutive_failures} consecutive failures"),
                            step,
                        ));
                    }
                    continue;
                }
                Err(err) => {
                    observation.catalog.release().await;
                    return Err(AgentError::Planner(err.to_string()));
                }
            };
            info!(action = %plan.action_type, thought = %plan.thought, "planned");

            let finish_requested = plan.is_finished || plan.action_type == ActionType::Finish;

            // Interactive override, with a keepalive ping so the CDP session
            // survives a slow operator.
            if self.config.interactive {
                let decision = self.review_with_keepalive(&page, manager.dialogs(), &plan).await;
                match gate_outcome(finish_requested, &decision) {
                    StepControl::Execute => {}
                    StepControl::Complete => {
                        observation.catalog.release().await;
                        return Ok((LoopStatus::Completed, finish_message(&plan), step));
                    }
                    StepControl::Replan => {
                        match decision {
                            GateDecision::Skip => {
                                history.add(format!("SKIPPED: {}", plan.summary()));
                            }
                            GateDecision::Override(instruction) => {
                                history.add(format!("OVERRIDDEN: {}", plan.summary()));
                                last_error = Some(format!("Operator instruction: {instruction}"));
                            }
                            _ => {}
                        }
                        observation.catalog.release().await;
                        continue;
                    }
                    StepControl::Stop => {
                        observation.catalog.release().await;
                        return Ok((LoopStatus::Cancelled, "stopped by operator".to_string(), step));
                    }
                }
            } else if finish_requested {
                observation.catalog.release().await;
                return Ok((LoopStatus::Completed, finish_message(&plan), step));
            }

            let result = self.executor.execute(&plan, &observation.catalog, manager).await;
            let action_summary = plan.summary();

            if result.success {
                history.add_success(&action_summary);
                if let Some(code) = &result.generated_code {
                    emitter.append_code(code, Some(&plan.thought))?;
                }
                last_error = None;
                consecutive_failures = 0;
            } else {
                let guidance = result
                    .user_guidance
                    .or(result.error)
                    .unwrap_or_else(|| "action failed".to_string());
                history.add_error(&action_summary, &guidance);
                last_error = Some(guidance.clone());
                consecutive_failures += 1;

                if !result.retryable && !self.config.interactive {
                    observation.catalog.release().await;
                    return Ok((
                        LoopStatus::Failed,
                        format!("unrecoverable: {guidance}"),
                        step,
                    ));
                }
                if consecutive_failures >= self.config.max_consecutive_failures {
                    observation.catalog.release().await;
                    return Ok((
                        LoopStatus::Failed,
                        format!("{consecutive_failures} consecutive failures"),
                        step,
                    ));
                }
            }

            observation.catalog.release().await;
        }

        Ok((
            LoopStatus::MaxStepsReached,
            format!("reached the {}-step limit", self.config.max_steps),
            self.config.max_steps,
        ))
    }

    async fn review_with_keepalive(
        &self,
        page: &Page,
        dialogs: &DialogWatcher,
        plan: &ActionPlan,
    ) -> GateDecision {
        let review = self.gate.review(plan);
        tokio::pin!(review);

        let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
        keepalive.tick().await; // consume the immediate first tick
        loop {
            tokio::select! {
                decision = &mut review => return decision,
                _ = keepalive.tick() => {
                    // Page JS is frozen while a dialog is open; a ping would
                    // block this arm and starve the review future.
                    if dialogs.pending().is_none() {
                        let _ = page.evaluate("document.title").await;
                    }
                }
            }
        }
    }
}

/// What the loop does with a reviewed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepControl {
    /// Run the plan through the executor.
    Execute,
    /// The run is complete.
    Complete,
    /// Discard the plan and go back to observation.
    Replan,
    /// End the run without completing.
    Stop,
}

/// Gate decision → loop control. An executed finish-flagged plan completes
/// the run in interactive mode too; Skip and Override discard the finish
/// claim and replan, and only Quit ends a run the planner has not finished.
fn gate_outcome(finish_requested: bool, decision: &GateDecision) -> StepControl {
    match decision {
        GateDecision::Quit => StepControl::Stop,
        GateDecision::Skip | GateDecision::Override(_) => StepControl::Replan,
        GateDecision::Execute if finish_requested => StepControl::Complete,
        GateDecision::Execute => StepControl::Execute,
    }
}

fn finish_message(plan: &ActionPlan) -> String {
    if plan.thought.is_empty() {
        "goal reached".to_string()
    } else {
        plan.thought.clone()
    }
}

/// High-level entry points: owned (launches a browser, records to a file)
/// and hosted (drives an external page, records to memory).
pub struct Agent {
    config: LoopConfig,
    planner: Arc<dyn Planner>,
    gate: Arc<dyn StepGate>,
}

impl Agent {
    pub fn new(config: LoopConfig, planner: Arc<dyn Planner>) -> Self {
        Self {
            config,
            planner,
            gate: Arc::new(NoopGate),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn StepGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Launch a browser, drive it toward the goal, close it, and return the
    /// result with the recorded script's path.
    pub async fn run_owned(&self, goal: &str) -> Result<LoopResult, AgentError> {
        let (browser, handler) = launch_browser(self.config.headless).await?;

        if let Some(url) = &self.config.start_url {
            browser
                .new_page(url.as_str())
                .await
                .map_err(|err| AgentError::Browser(err.to_string()))?;
        }

        let mut manager = ContextManager::new(browser, DialogWatcher::new()).await?;
        let mut emitter = FileEmitter::new(&self.config.output_dir);

        let agent_loop = AgentLoop::new(self.config.clone(), self.planner.clone(), self.gate.clone());
        let result = agent_loop.run(&mut manager, &mut emitter, goal).await;

        manager.close_browser().await;
        handler.abort();
        result
    }

    /// Drive an externally owned page; the result carries the script text.
    pub async fn run_hosted(&self, page: Page, goal: &str) -> Result<LoopResult, AgentError> {
        let mut manager = ContextManager::for_page(page, DialogWatcher::new()).await?;
        let mut emitter = MemoryEmitter::new();

        let agent_loop = AgentLoop::new(self.config.clone(), self.planner.clone(), self.gate.clone());
        agent_loop.run(&mut manager, &mut emitter, goal).await
    }
}
