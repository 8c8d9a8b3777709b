//! Plan dispatch.
//!
//! Four bands: meta (finish), context (tabs, dialogs, waits), navigation,
//! and element actions. Element actions resolve their target through the
//! synthesizer's double-check; the statement appended to the script embeds
//! the locator that was just verified unique-and-visible.

use std::time::Duration;

use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use flashloop_browser_context::{ContextManager, DialogChoice, StabilityWaiter};
use flashloop_core_types::{translate_driver_error, ActionPlan, ActionType, ExecutionResult};
use flashloop_locator::{LocatorError, Synthesizer, VerifiedTarget};
use flashloop_observer::Catalog;
use tracing::{debug, info, warn};
use url::Url;

use crate::primitives::{self, PrimitiveError, SelectMode};

/// Errors from these inputs indicate planner malfunction that more context
/// will not fix; the loop stops rather than replans.
const FATAL_MARKERS: &[&str] = &[
    "requires a target",
    "requires targetId",
    "requires a URL",
    "Unsupported action",
    "not found in memory",
    "not found",
    "Target ID is missing",
];

/// Whether an error message marks an unrecoverable planner input.
pub fn is_fatal_message(message: &str) -> bool {
    FATAL_MARKERS.iter().any(|marker| message.contains(marker))
}

const WAIT_FOR_ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);
const WAIT_FOR_ELEMENT_POLL: Duration = Duration::from_millis(500);
const POST_ACTION_DOM_TIMEOUT: Duration = Duration::from_secs(2);
const POST_ACTION_NETWORK_TIMEOUT: Duration = Duration::from_secs(1);

enum ExecError {
    /// Rejected before touching the page.
    Input(String),
    /// The driver or the page refused; raw message, translated on the way out.
    Driver(String),
}

impl From<PrimitiveError> for ExecError {
    fn from(err: PrimitiveError) -> Self {
        ExecError::Driver(err.to_string())
    }
}

impl From<LocatorError> for ExecError {
    fn from(err: LocatorError) -> Self {
        ExecError::Driver(err.to_string())
    }
}

type ExecOutcome = Result<Option<String>, ExecError>;

pub struct Executor {
    synthesizer: Synthesizer,
    stability: StabilityWaiter,
}

impl Executor {
    pub fn new(stability: StabilityWaiter) -> Self {
        Self {
            synthesizer: Synthesizer::new(),
            stability,
        }
    }

    /// Run one plan against the current catalog. Never panics, never leaks a
    /// raw driver error: failures come back translated with a retryability
    /// verdict.
    pub async fn execute(
        &self,
        plan: &ActionPlan,
        catalog: &Catalog,
        manager: &mut ContextManager,
    ) -> ExecutionResult {
        info!(action = %plan.action_type, "executing");
        match self.run(plan, catalog, manager).await {
            Ok(Some(code)) => ExecutionResult::ok_with_code(code),
            Ok(None) => ExecutionResult::ok(),
            Err(ExecError::Input(message)) => {
                warn!(%message, "plan rejected");
                let retryable = !is_fatal_message(&message);
                ExecutionResult::failed(message, retryable)
            }
            Err(ExecError::Driver(raw)) => {
                let translated = translate_driver_error(&raw);
                warn!(error = %raw, "action failed");
                let retryable = !is_fatal_message(&raw);
                ExecutionResult::failed(translated, retryable)
            }
        }
    }

    async fn run(
        &self,
        plan: &ActionPlan,
        catalog: &Catalog,
        manager: &mut ContextManager,
    ) -> ExecOutcome {
        let action = plan.action_type;

        if action.is_meta() {
            return Ok(None);
        }
        if action.is_context() {
            return self.run_context(plan, catalog, manager).await;
        }
        if action.is_navigation() {
            let page = catalog.page().clone();
            let code = self.run_navigation(plan, &page).await?;
            self.settle(&page).await;
            return Ok(code);
        }

        let page = catalog.page().clone();
        let code = self.run_element(plan, catalog, &page).await?;
        self.settle(&page).await;
        Ok(code)
    }

    async fn run_context(
        &self,
        plan: &ActionPlan,
        catalog: &Catalog,
        manager: &mut ContextManager,
    ) -> ExecOutcome {
        match plan.action_type {
            ActionType::SwitchTab => {
                let value = require_value(plan)?;
                if let Ok(index) = value.parse::<usize>() {
                    manager
                        .switch_by_index(index)
                        .await
                        .map_err(|err| ExecError::Driver(err.to_string()))?;
                    Ok(Some(format!(
                        "page = context.pages()[{index}]; await page.bringToFront();"
                    )))
                } else {
                    manager
                        .switch_by_query(&value)
                        .await
                        .map_err(|err| ExecError::Driver(err.to_string()))?;
                    let needle = flashloop_locator::escape_single_quoted(&value);
                    Ok(Some(format!(
                        "for (const candidate of context.pages()) {{\n  if ((await candidate.title()).includes('{needle}') || candidate.url().includes('{needle}')) {{ page = candidate; await page.bringToFront(); break; }}\n}}"
                    )))
                }
            }
            ActionType::CloseTab => {
                manager
                    .close_active()
                    .await
                    .map_err(|err| ExecError::Driver(err.to_string()))?;
                Ok(Some("await page.close();".to_string()))
            }
            ActionType::HandleDialog => {
                let value = require_value(plan)?;
                let choice = match value.as_str() {
                    "accept" => DialogChoice::Accept,
                    "dismiss" => DialogChoice::Dismiss,
                    other => {
                        return Err(ExecError::Input(format!(
                            "handle_dialog value must be 'accept' or 'dismiss', got '{other}'"
                        )))
                    }
                };
                manager
                    .dialogs()
                    .handle(choice)
                    .await
                    .map_err(|err| ExecError::Driver(err.to_string()))?;
                let method = if choice == DialogChoice::Accept {
                    "accept"
                } else {
                    "dismiss"
                };
                Ok(Some(format!(
                    "page.once('dialog', (dialog) => dialog.{method}());"
                )))
            }
            ActionType::WaitForElement => {
                let info = lookup_target(plan, catalog)?;
                let page = catalog.page();
                let deadline = tokio::time::Instant::now() + WAIT_FOR_ELEMENT_TIMEOUT;
                loop {
                    match self.synthesizer.synthesize(page, info).await {
                        Ok(target) => {
                            return Ok(Some(format!(
                                "await {}.waitFor({{ state: 'visible', timeout: 10000 }});",
                                target.expression
                            )));
                        }
                        Err(LocatorError::FailedRobustSelector { .. })
                            if tokio::time::Instant::now() < deadline =>
                        {
                            tokio::time::sleep(WAIT_FOR_ELEMENT_POLL).await;
                        }
                        Err(LocatorError::FailedRobustSelector { id }) => {
                            return Err(ExecError::Driver(format!(
                                "Timeout: element {id} did not become visible within 10s"
                            )));
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            }
            _ => unreachable!("non-context action routed to run_context"),
        }
    }

    async fn run_navigation(&self, plan: &ActionPlan, page: &Page) -> ExecOutcome {
        match plan.action_type {
            ActionType::Navigate => {
                let value = plan.value.clone().filter(|v| !v.is_empty()).ok_or_else(|| {
                    ExecError::Input("Action 'navigate' requires a URL value".to_string())
                })?;
                let url = Url::parse(&value)
                    .map_err(|err| ExecError::Input(format!("Invalid URL '{value}': {err}")))?;
                page.goto(url.as_str())
                    .await
                    .map_err(|err| ExecError::Driver(err.to_string()))?;
                Ok(Some(format!(
                    "await page.goto('{}');",
                    flashloop_locator::escape_single_quoted(url.as_str())
                )))
            }
            ActionType::Reload => {
                page.reload()
                    .await
                    .map_err(|err| ExecError::Driver(err.to_string()))?;
                Ok(Some("await page.reload();".to_string()))
            }
            ActionType::GoBack => {
                primitives::go_back(page).await?;
                Ok(Some("await page.goBack();".to_string()))
            }
            _ => unreachable!("non-navigation action routed to run_navigation"),
        }
    }

    async fn run_element(
        &self,
        plan: &ActionPlan,
        catalog: &Catalog,
        page: &Page,
    ) -> ExecOutcome {
        let action = plan.action_type;

        // Page-level scroll when the planner names no target.
        if action == ActionType::Scroll && plan.target_id.is_none() {
            primitives::scroll_page(page).await?;
            return Ok(Some("await page.mouse.wheel(0, 600);".to_string()));
        }
        // URL assertions act on the page, not an element.
        if action == ActionType::AssertUrl {
            let value = require_value(plan)?;
            primitives::assert_url(page, &value).await?;
            return Ok(Some(format!(
                "await expect(page).toHaveURL('{}');",
                flashloop_locator::escape_single_quoted(&value)
            )));
        }

        let info = lookup_target(plan, catalog)?;
        let target = self.synthesizer.synthesize(page, info).await?;
        debug!(element = %info.id, locator = %target.expression, "target verified");

        let statement = match action {
            ActionType::Click => {
                primitives::click(page, target.node_index).await?;
                format!("await {}.click();", target.expression)
            }
            ActionType::Dblclick => {
                primitives::dblclick(page, target.node_index).await?;
                format!("await {}.dblclick();", target.expression)
            }
            ActionType::RightClick => {
                primitives::right_click(page, target.node_index).await?;
                format!("await {}.click({{ button: 'right' }});", target.expression)
            }
            ActionType::Hover => {
                primitives::hover(page, target.node_index).await?;
                format!("await {}.hover();", target.expression)
            }
            ActionType::Focus => {
                primitives::focus(page, target.node_index).await?;
                format!("await {}.focus();", target.expression)
            }
            ActionType::Clear => {
                primitives::clear(page, target.node_index).await?;
                format!("await {}.clear();", target.expression)
            }
            ActionType::Check => {
                primitives::set_checked(page, target.node_index, true).await?;
                format!("await {}.check();", target.expression)
            }
            ActionType::Uncheck => {
                primitives::set_checked(page, target.node_index, false).await?;
                format!("await {}.uncheck();", target.expression)
            }
            ActionType::Fill => {
                let value = require_value(plan)?;
                primitives::fill(page, target.node_index, &value).await?;
                format!(
                    "await {}.fill('{}');",
                    target.expression,
                    flashloop_locator::escape_single_quoted(&value)
                )
            }
            ActionType::Type => {
                let value = require_value(plan)?;
                primitives::type_text(page, target.node_index, &value).await?;
                format!(
                    "await {}.pressSequentially('{}');",
                    target.expression,
                    flashloop_locator::escape_single_quoted(&value)
                )
            }
            ActionType::Keypress => {
                let value = require_value(plan)?;
                primitives::press_key(page, target.node_index, &value).await?;
                format!(
                    "await {}.press('{}');",
                    target.expression,
                    flashloop_locator::escape_single_quoted(&value)
                )
            }
            ActionType::SelectOption => {
                let value = require_value(plan)?;
                let mode = primitives::select_option(page, target.node_index, &value).await?;
                let escaped = flashloop_locator::escape_single_quoted(&value);
                match mode {
                    SelectMode::Label => format!(
                        "await {}.selectOption({{ label: '{escaped}' }});",
                        target.expression
                    ),
                    SelectMode::Value => {
                        format!("await {}.selectOption('{escaped}');", target.expression)
                    }
                }
            }
            ActionType::Upload => {
                let value = require_value(plan)?;
                let files: Vec<String> = value
                    .split(',')
                    .map(|path| path.trim().to_string())
                    .filter(|path| !path.is_empty())
                    .collect();
                primitives::upload(page, target.node_index, files.clone()).await?;
                let list = files
                    .iter()
                    .map(|path| format!("'{}'", flashloop_locator::escape_single_quoted(path)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("await {}.setInputFiles([{list}]);", target.expression)
            }
            ActionType::Scroll => {
                primitives::scroll_into_view(page, target.node_index).await?;
                format!("await {}.scrollIntoViewIfNeeded();", target.expression)
            }
            ActionType::DragAndDrop => {
                let second = plan.target_id2.as_deref().ok_or_else(|| {
                    ExecError::Input(
                        "Action 'drag_and_drop' requires a target element ID pair (targetId2)"
                            .to_string(),
                    )
                })?;
                let second_info = catalog.get(second).map(|entry| &entry.info).ok_or_else(|| {
                    ExecError::Input(format!(
                        "Target ID '{second}' not found in the current element catalog"
                    ))
                })?;
                let aux = self.synthesizer.synthesize(page, second_info).await?;
                primitives::drag_to(page, target.node_index, aux.node_index).await?;
                format!("await {}.dragTo({});", target.expression, aux.expression)
            }
            ActionType::AssertVisible => {
                primitives::assert_visible(page, target.node_index).await?;
                format!("await expect({}).toBeVisible();", target.expression)
            }
            ActionType::AssertText => {
                let value = require_value(plan)?;
                primitives::assert_text(page, target.node_index, &value).await?;
                format!(
                    "await expect({}).toContainText('{}');",
                    target.expression,
                    flashloop_locator::escape_single_quoted(&value)
                )
            }
            ActionType::AssertValue => {
                let value = require_value(plan)?;
                primitives::assert_value(page, target.node_index, &value).await?;
                format!(
                    "await expect({}).toHaveValue('{}');",
                    target.expression,
                    flashloop_locator::escape_single_quoted(&value)
                )
            }
            other => {
                return Err(ExecError::Input(format!(
                    "Unsupported action '{}' in element band",
                    other.name()
                )))
            }
        };

        Ok(Some(annotate(statement, &target)))
    }

    /// Post-action restabilization: `domcontentloaded`, a best-effort second
    /// of network quiet, then DOM quiescence. Errors here are absorbed; the
    /// next observation re-reads whatever state the page ends up in.
    async fn settle(&self, page: &Page) {
        let params = EvaluateParams::builder()
            .expression(
                "new Promise((resolve) => { \
                 if (document.readyState !== 'loading') { resolve(true); return; } \
                 document.addEventListener('DOMContentLoaded', () => resolve(true), { once: true }); })",
            )
            .await_promise(true)
            .return_by_value(true)
            .build();
        if let Ok(params) = params {
            let _ = tokio::time::timeout(POST_ACTION_DOM_TIMEOUT, page.evaluate(params)).await;
        }
        let _ = tokio::time::timeout(POST_ACTION_NETWORK_TIMEOUT, page.wait_for_navigation()).await;
        if let Err(err) = self.stability.wait_for_stable(page).await {
            debug!("stability wait skipped: {err}");
        }
    }
}

/// XPath locators are brittle; flag them in the recorded script.
fn annotate(statement: String, target: &VerifiedTarget) -> String {
    if target.is_last_resort() {
        format!("// WARNING: XPath fallback locator; no user-visible selector matched uniquely\n{statement}")
    } else {
        statement
    }
}

fn require_value(plan: &ActionPlan) -> Result<String, ExecError> {
    plan.value.clone().filter(|v| !v.is_empty()).ok_or_else(|| {
        ExecError::Input(format!(
            "Action '{}' requires a value",
            plan.action_type.name()
        ))
    })
}

fn lookup_target<'a>(
    plan: &ActionPlan,
    catalog: &'a Catalog,
) -> Result<&'a flashloop_core_types::ElementInfo, ExecError> {
    let target_id = plan.target_id.as_deref().filter(|id| !id.is_empty()).ok_or_else(|| {
        ExecError::Input(format!(
            "Action '{}' requires a target element ID",
            plan.action_type.name()
        ))
    })?;
    catalog
        .get(target_id)
        .map(|entry| &entry.info)
        .ok_or_else(|| {
            ExecError::Input(format!(
                "Target ID '{target_id}' not found in the current element catalog"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_markers() {
        assert!(is_fatal_message("Action 'click' requires a target element ID"));
        assert!(is_fatal_message("Action 'navigate' requires a URL value"));
        assert!(is_fatal_message(
            "Target ID 'button-0000-9' not found in the current element catalog"
        ));
        assert!(is_fatal_message("Unsupported action 'dance'"));
    }

    #[test]
    fn test_recoverable_messages() {
        assert!(!is_fatal_message("Timeout: the page kept mutating"));
        assert!(!is_fatal_message("Node is detached from document"));
        assert!(!is_fatal_message("no pending dialog to handle"));
        assert!(!is_fatal_message("tab index 4 out of range (0..2)"));
        assert!(!is_fatal_message("no tab matching 'checkout' was found"));
    }

    #[test]
    fn test_fatal_vs_failed_selector() {
        // Selector synthesis failures feed back into planning; they must not
        // be classified as fatal.
        let err = LocatorError::FailedRobustSelector {
            id: "button-12ab34cd-0".into(),
        };
        assert!(!is_fatal_message(&err.to_string()));
    }
}
