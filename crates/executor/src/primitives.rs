//! Low-level page operations.
//!
//! Pointer actions go through CDP `Input.dispatchMouseEvent` at frame-offset
//! corrected element centers; value changes happen inside the page with the
//! native value setter plus `input`/`change` events so framework-bound forms
//! notice them. Elements are addressed by arena index, parked there by the
//! synthesizer's probe moments earlier.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
    MouseButton,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrimitiveError {
    #[error("{0}")]
    Driver(String),

    /// A failure reported from inside the page (option missing, handle gone).
    #[error("{0}")]
    Page(String),
}

impl PrimitiveError {
    fn driver(err: impl std::fmt::Display) -> Self {
        Self::Driver(err.to_string())
    }
}

fn none_outcome<T>() -> Option<T> {
    None
}

/// Result envelope for in-page scripts: `{ ok: ... }` or `{ error: ... }`.
#[derive(Debug, Deserialize)]
struct PageOutcome<T> {
    #[serde(default = "none_outcome")]
    ok: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

async fn eval<T: serde::de::DeserializeOwned + Send + 'static>(
    page: &Page,
    script: String,
) -> Result<T, PrimitiveError> {
    let params = EvaluateParams::builder()
        .expression(script)
        .return_by_value(true)
        .build()
        .map_err(PrimitiveError::Driver)?;
    let result = page.evaluate(params).await.map_err(PrimitiveError::driver)?;
    result.into_value().map_err(PrimitiveError::driver)
}

async fn eval_outcome<T: serde::de::DeserializeOwned + Send + 'static>(
    page: &Page,
    script: String,
) -> Result<T, PrimitiveError> {
    let outcome: PageOutcome<T> = eval(page, script).await?;
    if let Some(error) = outcome.error {
        return Err(PrimitiveError::Page(error));
    }
    outcome
        .ok
        .ok_or_else(|| PrimitiveError::Page("page script returned no result".to_string()))
}

fn js_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Scroll the node into view and return its center in root-viewport
/// coordinates, walking up `frameElement` offsets.
async fn center_of(page: &Page, index: u32) -> Result<Point, PrimitiveError> {
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    el.scrollIntoView({{ block: 'center', inline: 'center' }});
    const rect = el.getBoundingClientRect();
    let x = rect.left + rect.width / 2;
    let y = rect.top + rect.height / 2;
    let win = el.ownerDocument.defaultView;
    while (win && win.frameElement) {{
        const frameRect = win.frameElement.getBoundingClientRect();
        x += frameRect.left;
        y += frameRect.top;
        win = win.parent;
    }}
    return {{ ok: {{ x, y }} }};
}})()
"#
    );
    eval_outcome(page, script).await
}

async fn mouse_move(page: &Page, x: f64, y: f64) -> Result<(), PrimitiveError> {
    let params = DispatchMouseEventParams::builder()
        .r#type(DispatchMouseEventType::MouseMoved)
        .x(x)
        .y(y)
        .build()
        .map_err(PrimitiveError::Driver)?;
    page.execute(params).await.map_err(PrimitiveError::driver)?;
    Ok(())
}

async fn mouse_press_release(
    page: &Page,
    x: f64,
    y: f64,
    button: MouseButton,
    click_count: i64,
) -> Result<(), PrimitiveError> {
    for event_type in [
        DispatchMouseEventType::MousePressed,
        DispatchMouseEventType::MouseReleased,
    ] {
        let params = DispatchMouseEventParams::builder()
            .r#type(event_type)
            .x(x)
            .y(y)
            .button(button.clone())
            .click_count(click_count)
            .build()
            .map_err(PrimitiveError::Driver)?;
        page.execute(params).await.map_err(PrimitiveError::driver)?;
    }
    Ok(())
}

pub async fn click(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    let point = center_of(page, index).await?;
    mouse_move(page, point.x, point.y).await?;
    mouse_press_release(page, point.x, point.y, MouseButton::Left, 1).await
}

pub async fn dblclick(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    let point = center_of(page, index).await?;
    mouse_move(page, point.x, point.y).await?;
    mouse_press_release(page, point.x, point.y, MouseButton::Left, 2).await
}

pub async fn right_click(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    let point = center_of(page, index).await?;
    mouse_move(page, point.x, point.y).await?;
    mouse_press_release(page, point.x, point.y, MouseButton::Right, 1).await
}

pub async fn hover(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    let point = center_of(page, index).await?;
    mouse_move(page, point.x, point.y).await
}

pub async fn drag_to(page: &Page, source: u32, target: u32) -> Result<(), PrimitiveError> {
    let from = center_of(page, source).await?;
    let to = center_of(page, target).await?;

    mouse_move(page, from.x, from.y).await?;
    let params = DispatchMouseEventParams::builder()
        .r#type(DispatchMouseEventType::MousePressed)
        .x(from.x)
        .y(from.y)
        .button(MouseButton::Left)
        .click_count(1)
        .build()
        .map_err(PrimitiveError::Driver)?;
    page.execute(params).await.map_err(PrimitiveError::driver)?;

    // A couple of intermediate moves so drag handlers see motion.
    for step in 1..=3 {
        let t = f64::from(step) / 3.0;
        mouse_move(page, from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t).await?;
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let params = DispatchMouseEventParams::builder()
        .r#type(DispatchMouseEventType::MouseReleased)
        .x(to.x)
        .y(to.y)
        .button(MouseButton::Left)
        .click_count(1)
        .build()
        .map_err(PrimitiveError::Driver)?;
    page.execute(params).await.map_err(PrimitiveError::driver)?;
    Ok(())
}

pub async fn focus(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    el.focus();
    return {{ ok: true }};
}})()
"#
    );
    eval_outcome::<bool>(page, script).await.map(|_| ())
}

/// Set a field's value through the native setter so React/Vue style
/// listeners observe the change.
pub async fn set_value(page: &Page, index: u32, value: &str) -> Result<(), PrimitiveError> {
    let value = js_literal(value);
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    const win = el.ownerDocument.defaultView;
    el.focus();
    const tag = el.tagName;
    if (tag === 'INPUT' || tag === 'TEXTAREA') {{
        const proto = tag === 'TEXTAREA' ? win.HTMLTextAreaElement.prototype : win.HTMLInputElement.prototype;
        const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
        if (descriptor && descriptor.set) descriptor.set.call(el, {value});
        else el.value = {value};
    }} else if (el.isContentEditable) {{
        el.textContent = {value};
    }} else {{
        return {{ error: 'element does not accept text input' }};
    }}
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return {{ ok: true }};
}})()
"#
    );
    eval_outcome::<bool>(page, script).await.map(|_| ())
}

pub async fn fill(page: &Page, index: u32, value: &str) -> Result<(), PrimitiveError> {
    set_value(page, index, value).await
}

pub async fn clear(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    set_value(page, index, "").await
}

/// Keystroke-by-keystroke typing into the focused element.
pub async fn type_text(page: &Page, index: u32, value: &str) -> Result<(), PrimitiveError> {
    focus(page, index).await?;
    for c in value.chars() {
        let params = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .text(c.to_string())
            .build()
            .map_err(PrimitiveError::Driver)?;
        page.execute(params).await.map_err(PrimitiveError::driver)?;
    }
    Ok(())
}

/// Press a key, with `Control+Shift+K` style modifier parsing.
pub async fn press_key(page: &Page, index: u32, key: &str) -> Result<(), PrimitiveError> {
    focus(page, index).await?;

    let parts: Vec<&str> = key.split('+').collect();
    let (modifiers, key_name) = if parts.len() > 1 {
        let mut flags = 0i64;
        for modifier in &parts[..parts.len() - 1] {
            match modifier.to_lowercase().as_str() {
                "alt" | "option" => flags |= 1,
                "control" | "ctrl" => flags |= 2,
                "meta" | "cmd" | "command" => flags |= 4,
                "shift" => flags |= 8,
                _ => {}
            }
        }
        (flags, parts[parts.len() - 1])
    } else {
        (0, key)
    };

    for event_type in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
        let params = DispatchKeyEventParams::builder()
            .r#type(event_type)
            .key(key_name)
            .modifiers(modifiers)
            .build()
            .map_err(PrimitiveError::Driver)?;
        page.execute(params).await.map_err(PrimitiveError::driver)?;
    }
    Ok(())
}

pub async fn set_checked(page: &Page, index: u32, checked: bool) -> Result<(), PrimitiveError> {
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    if (el.tagName !== 'INPUT') return {{ error: 'not a checkbox or radio input' }};
    if (el.checked !== {checked}) el.click();
    return {{ ok: true }};
}})()
"#
    );
    eval_outcome::<bool>(page, script).await.map(|_| ())
}

/// How a `select_option` value matched, which decides the recorded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    Label,
    Value,
}

/// Select an option by visible label first, falling back to the value
/// attribute.
pub async fn select_option(
    page: &Page,
    index: u32,
    value: &str,
) -> Result<SelectMode, PrimitiveError> {
    let value_literal = js_literal(value);
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    if (el.tagName !== 'SELECT') return {{ error: 'not a <select> element' }};
    const wanted = {value_literal};
    const collapse = (text) => (text || '').replace(/\s+/g, ' ').trim();
    const options = Array.from(el.options);
    let mode = 'label';
    let option = options.find((o) => collapse(o.label || o.textContent) === wanted);
    if (!option) {{
        option = options.find((o) => o.value === wanted);
        mode = 'value';
    }}
    if (!option) return {{ error: 'option not found: ' + wanted }};
    el.value = option.value;
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return {{ ok: mode }};
}})()
"#
    );
    eval_outcome(page, script).await
}

/// Attach local files to a file input through `DOM.setFileInputFiles`.
pub async fn upload(page: &Page, index: u32, files: Vec<String>) -> Result<(), PrimitiveError> {
    let params = EvaluateParams::builder()
        .expression(format!("window.__flashNodes && window.__flashNodes[{index}]"))
        .build()
        .map_err(PrimitiveError::Driver)?;
    let result = page.evaluate(params).await.map_err(PrimitiveError::driver)?;
    let object_id = result
        .object()
        .object_id
        .clone()
        .ok_or_else(|| PrimitiveError::Page("element handle is gone".to_string()))?;

    let params = SetFileInputFilesParams::builder()
        .files(files)
        .object_id(object_id)
        .build()
        .map_err(PrimitiveError::Driver)?;
    page.execute(params).await.map_err(PrimitiveError::driver)?;
    Ok(())
}

/// Bring the element into the viewport.
pub async fn scroll_into_view(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    center_of(page, index).await.map(|_| ())
}

/// Scroll the page itself by most of a viewport height.
pub async fn scroll_page(page: &Page) -> Result<(), PrimitiveError> {
    let script = "(() => { window.scrollBy(0, Math.round(window.innerHeight * 0.8)); \
                  return { ok: true }; })()";
    eval_outcome::<bool>(page, script.to_string()).await.map(|_| ())
}

/// Assertion primitives. These re-read the live node so a stale arena entry
/// fails loudly instead of passing vacuously.
pub async fn assert_visible(page: &Page, index: u32) -> Result<(), PrimitiveError> {
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    const win = el.ownerDocument.defaultView;
    const style = win.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    const visible = style.display !== 'none' && style.visibility !== 'hidden'
        && parseFloat(style.opacity) !== 0 && rect.width > 0 && rect.height > 0;
    return visible ? {{ ok: true }} : {{ error: 'element is not visible' }};
}})()
"#
    );
    eval_outcome::<bool>(page, script).await.map(|_| ())
}

pub async fn assert_text(page: &Page, index: u32, expected: &str) -> Result<(), PrimitiveError> {
    let expected = js_literal(expected);
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    const collapse = (text) => (text || '').replace(/\s+/g, ' ').trim();
    const actual = collapse(el.innerText !== undefined ? el.innerText : el.textContent);
    if (actual.includes({expected})) return {{ ok: true }};
    return {{ error: 'expected text ' + {expected} + ' but found "' + actual.slice(0, 80) + '"' }};
}})()
"#
    );
    eval_outcome::<bool>(page, script).await.map(|_| ())
}

pub async fn assert_value(page: &Page, index: u32, expected: &str) -> Result<(), PrimitiveError> {
    let expected = js_literal(expected);
    let script = format!(
        r#"
(() => {{
    const el = window.__flashNodes && window.__flashNodes[{index}];
    if (!el) return {{ error: 'element handle is gone' }};
    const actual = el.value !== undefined ? el.value : '';
    if (actual === {expected}) return {{ ok: true }};
    return {{ error: 'expected value ' + {expected} + ' but found "' + actual.slice(0, 80) + '"' }};
}})()
"#
    );
    eval_outcome::<bool>(page, script).await.map(|_| ())
}

pub async fn assert_url(page: &Page, expected: &str) -> Result<(), PrimitiveError> {
    let actual = page
        .url()
        .await
        .map_err(PrimitiveError::driver)?
        .unwrap_or_default();
    if actual == expected || actual.contains(expected) {
        Ok(())
    } else {
        Err(PrimitiveError::Page(format!(
            "expected URL '{expected}' but the page is at '{actual}'"
        )))
    }
}

pub async fn go_back(page: &Page) -> Result<(), PrimitiveError> {
    page.evaluate("window.history.back()")
        .await
        .map_err(PrimitiveError::driver)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_outcome_envelope() {
        let ok: PageOutcome<bool> = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert_eq!(ok.ok, Some(true));
        assert!(ok.error.is_none());

        let err: PageOutcome<bool> = serde_json::from_str(r#"{"error": "gone"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("gone"));
    }

    #[test]
    fn test_select_mode_decodes() {
        let mode: SelectMode = serde_json::from_str("\"label\"").unwrap();
        assert_eq!(mode, SelectMode::Label);
        let mode: SelectMode = serde_json::from_str("\"value\"").unwrap();
        assert_eq!(mode, SelectMode::Value);
    }

    #[test]
    fn test_js_literal_quotes() {
        assert_eq!(js_literal("a'b"), "\"a'b\"");
        assert_eq!(js_literal("a\"b"), r#""a\"b""#);
    }
}
