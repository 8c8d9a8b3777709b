//! Prompt assembly.

use flashloop_core_types::ActionPlan;

use crate::PlanRequest;

/// System prompt establishing the agent contract: semantic-ID references,
/// scroll before off-screen interaction, strategy changes after errors, tab
/// hygiene, and an adaptive plan kept honest via `isPlanChanged`.
pub const SYSTEM_PROMPT: &str = r#"You are a web automation agent driving a real browser toward a goal, one action per step.

Each step you receive the page state: URL, title, and one line per interactable element currently in the viewport, each ending with [ID: <semantic-id>]. A trailing line may report elements below the fold.

Rules:
1. Refer to elements ONLY by their semantic ID, exactly as printed after "ID:". Never invent IDs and never reuse IDs from earlier steps; they are reissued at every observation.
2. If the element you need is not listed, it is probably off-screen: issue a 'scroll' action (with a scrollable container as target, or no target to scroll the page) and look again.
3. If the previous step failed, the error advice tells you why. Change strategy; do not repeat the exact same action.
4. Close tabs that are ads or irrelevant to the goal ('close_tab'), and switch to the tab the goal needs ('switch_tab' with an index or a title/URL fragment).
5. If a dialog banner is shown, answer it first with 'handle_dialog' (value "accept" or "dismiss") before any other action.
6. Maintain the plan block: currentStatus, up to three remainingSteps, and set isPlanChanged to true whenever reality diverged from your previous plan.
7. Use 'fill' for form fields, 'type' only when a site needs real keystrokes, 'keypress' for single keys like Enter.
8. Prefer assertions ('assert_visible', 'assert_text', 'assert_value', 'assert_url') to confirm outcomes the goal cares about.
9. When the goal is reached, respond with actionType "finish" and isFinished true.

Respond with a single JSON object matching this schema, and nothing else:

"#;

/// Full system prompt with the response schema appended.
pub fn system_prompt() -> String {
    let schema = schemars::schema_for!(ActionPlan);
    let schema_json =
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
    format!("{SYSTEM_PROMPT}{schema_json}\n")
}

/// The per-step user message: goal, state, recent history, last error.
pub fn user_message(request: &PlanRequest) -> String {
    let mut sections = vec![format!("GOAL:\n{}", request.goal)];

    sections.push(format!("CURRENT PAGE STATE:\n{}", request.state_text));

    if request.history.is_empty() {
        sections.push("HISTORY:\n(first step)".to_string());
    } else {
        sections.push(format!("HISTORY:\n{}", request.history.join("\n")));
    }

    if let Some(error) = &request.last_error {
        sections.push(format!(
            "PREVIOUS STEP FAILED:\n{error}\nChange your approach this step."
        ));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PlanRequest {
        PlanRequest {
            goal: "log in".into(),
            state_text: "URL: https://example.com\nTitle: Example\n\n- button \"Login\" [ID: button-1a2b3c4d-0]".into(),
            history: vec!["SUCCESS: fill input-9f8e7d6c-0".into()],
            last_error: None,
        }
    }

    #[test]
    fn test_system_prompt_embeds_schema() {
        let prompt = system_prompt();
        assert!(prompt.contains("actionType"));
        assert!(prompt.contains("isFinished"));
        assert!(prompt.contains("semantic ID"));
    }

    #[test]
    fn test_user_message_sections() {
        let message = user_message(&request());
        assert!(message.starts_with("GOAL:\nlog in"));
        assert!(message.contains("CURRENT PAGE STATE:"));
        assert!(message.contains("SUCCESS: fill input-9f8e7d6c-0"));
        assert!(!message.contains("PREVIOUS STEP FAILED"));
    }

    #[test]
    fn test_last_error_surfaces() {
        let mut req = request();
        req.last_error = Some("Timeout: the page kept mutating".into());
        let message = user_message(&req);
        assert!(message.contains("PREVIOUS STEP FAILED:\nTimeout"));
        assert!(message.contains("Change your approach"));
    }

    #[test]
    fn test_empty_history_marker() {
        let mut req = request();
        req.history.clear();
        assert!(user_message(&req).contains("(first step)"));
    }
}
