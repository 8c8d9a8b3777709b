//! End-to-end shape checks that need no browser: plan decoding, locator
//! expressions, retryability classification, and the recorded-script
//! artifact.

use flash_loop::{ActionPlan, ActionType};
use flashloop_agent_core::{MemoryEmitter, ScriptEmitter};
use flashloop_executor::is_fatal_message;
use flashloop_locator::{locator_expression, Candidate};
use flashloop_planner::provider::decode_plan;

#[test]
fn login_run_records_a_wellformed_test_file() {
    let email = locator_expression(
        &[],
        &Candidate::Role {
            role: "textbox".into(),
            name: "email".into(),
        },
    );
    let password = locator_expression(
        &[],
        &Candidate::Role {
            role: "textbox".into(),
            name: "pw".into(),
        },
    );
    let login = locator_expression(
        &[],
        &Candidate::Role {
            role: "button".into(),
            name: "Login".into(),
        },
    );

    let mut emitter = MemoryEmitter::new();
    emitter.init("log in as foo@bar.com").unwrap();
    emitter
        .append_code(&format!("await {email}.fill('foo@bar.com');"), Some("enter the email"))
        .unwrap();
    emitter
        .append_code(&format!("await {password}.fill('pw');"), None)
        .unwrap();
    emitter
        .append_code(&format!("await {login}.click();"), Some("submit the form"))
        .unwrap();
    emitter.finish().unwrap();

    let script = emitter.output();
    assert!(script.starts_with("import { test, expect } from '@playwright/test';"));
    assert!(script.contains("test('log in as foo@bar.com', async ({ page, context }) => {"));
    assert!(script.contains(
        "await page.getByRole('textbox', { name: 'email', exact: true }).fill('foo@bar.com');"
    ));
    assert!(script.contains(
        "await page.getByRole('button', { name: 'Login', exact: true }).click();"
    ));
    assert!(script.trim_end().ends_with("});"));
    assert_eq!(script.matches('{').count(), script.matches('}').count());
}

#[test]
fn model_output_decodes_into_the_closed_action_set() {
    let plan: ActionPlan = decode_plan(
        "```json\n{\n  \"thought\": \"the button is visible now\",\n  \"actionType\": \"click\",\n  \"targetId\": \"button-5f6e7d8c-0\",\n  \"isFinished\": false\n}\n```",
    )
    .unwrap();
    assert_eq!(plan.action_type, ActionType::Click);
    assert_eq!(plan.target_id.as_deref(), Some("button-5f6e7d8c-0"));

    // Unknown action names are rejected at decode time, before dispatch.
    assert!(decode_plan(r#"{"actionType": "teleport"}"#).is_err());
}

#[test]
fn unknown_target_is_unrecoverable() {
    // The executor phrases catalog misses exactly like this; the loop must
    // treat them as fatal in non-interactive mode.
    let message = "Target ID 'btn-xxxx-1' not found in the current element catalog";
    assert!(is_fatal_message(message));

    // Driver-level flakiness stays retryable.
    assert!(!is_fatal_message("Timeout: the element did not respond"));
    assert!(!is_fatal_message(
        "failed to synthesize a robust selector for element button-5f6e7d8c-0"
    ));
}

#[test]
fn xpath_fallback_is_flagged_in_the_fragment() {
    let xpath = locator_expression(
        &[],
        &Candidate::XPath("/html[1]/body[1]/div[3]/button[2]".into()),
    );
    assert_eq!(xpath, "page.locator('xpath=/html[1]/body[1]/div[3]/button[2]')");

    let mut emitter = MemoryEmitter::new();
    emitter.init("click 'Load more'").unwrap();
    emitter
        .append_code(
            &format!("// WARNING: XPath fallback locator; no user-visible selector matched uniquely\nawait {xpath}.click();"),
            None,
        )
        .unwrap();
    emitter.finish().unwrap();
    assert!(emitter.output().contains("  // WARNING: XPath fallback locator"));
}

#[test]
fn frame_chained_locators_nest_frame_locators() {
    let expr = locator_expression(
        &["iframe[name=\"payments\"]".to_string()],
        &Candidate::Placeholder("Card number".into()),
    );
    assert_eq!(
        expr,
        "page.frameLocator('iframe[name=\"payments\"]').getByPlaceholder('Card number')"
    );
}
