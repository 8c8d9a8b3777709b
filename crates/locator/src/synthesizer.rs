//! The double-check itself.
//!
//! Every candidate is probed on the live page: resolve the frame chain,
//! collect matches the way the recorded locator would, filter to visible
//! ones, and accept only an exactly-one outcome. The accepted probe parks
//! the matched node in the observation arena so the executor acts on the
//! very element the emitted locator describes.

use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use flashloop_core_types::ElementInfo;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::candidates::{candidates_for, Candidate};
use crate::code::locator_expression;

#[derive(Debug, Error)]
pub enum LocatorError {
    /// Every candidate failed the unique-and-visible check.
    #[error("failed to synthesize a robust selector for element {id}")]
    FailedRobustSelector { id: String },

    #[error("driver error: {0}")]
    Driver(String),
}

/// A selector that passed the double-check, with the live handle and the
/// script expression that reproduces it.
#[derive(Debug, Clone)]
pub struct VerifiedTarget {
    pub candidate: Candidate,
    /// Playwright locator expression, frame chain included.
    pub expression: String,
    /// Arena index of the matched node, valid for this step.
    pub node_index: u32,
    /// Center of the matched node in root-viewport coordinates.
    pub center: (f64, f64),
}

impl VerifiedTarget {
    pub fn is_last_resort(&self) -> bool {
        self.candidate.is_last_resort()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeOutcome {
    #[serde(default)]
    count: u32,
    #[serde(default)]
    visible_count: u32,
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    cx: Option<f64>,
    #[serde(default)]
    cy: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    /// First candidate that matches exactly one visible element right now.
    pub async fn synthesize(
        &self,
        page: &Page,
        info: &ElementInfo,
    ) -> Result<VerifiedTarget, LocatorError> {
        for candidate in candidates_for(info) {
            let script = probe_script(&info.frame_chain, &candidate);
            let params = EvaluateParams::builder()
                .expression(script)
                .return_by_value(true)
                .build()
                .map_err(LocatorError::Driver)?;

            let outcome: ProbeOutcome = match page.evaluate(params).await {
                Ok(result) => match result.into_value() {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        debug!(candidate = candidate.label(), "probe decode failed: {err}");
                        continue;
                    }
                },
                Err(err) => {
                    debug!(candidate = candidate.label(), "probe failed: {err}");
                    continue;
                }
            };

            if outcome.count == 1 && outcome.visible_count == 1 {
                if let (Some(index), Some(cx), Some(cy)) = (outcome.index, outcome.cx, outcome.cy) {
                    debug!(
                        element = %info.id,
                        candidate = candidate.label(),
                        "selector verified"
                    );
                    return Ok(VerifiedTarget {
                        expression: locator_expression(&info.frame_chain, &candidate),
                        candidate,
                        node_index: index,
                        center: (cx, cy),
                    });
                }
            }
            debug!(
                element = %info.id,
                candidate = candidate.label(),
                count = outcome.count,
                visible = outcome.visible_count,
                "candidate rejected"
            );
        }
        Err(LocatorError::FailedRobustSelector {
            id: info.id.clone(),
        })
    }
}

/// Build the verification probe for one candidate.
fn probe_script(frame_chain: &[String], candidate: &Candidate) -> String {
    let chain_json =
        serde_json::to_string(frame_chain).unwrap_or_else(|_| "[]".to_string());
    let matcher = matcher_fragment(candidate);

    format!(
        r#"
(() => {{
    const chain = {chain_json};
    let doc = document;
    let ox = 0, oy = 0;
    for (const sel of chain) {{
        const host = doc.querySelector(sel);
        if (!host || !host.contentDocument) return {{ count: 0, visibleCount: 0 }};
        const rect = host.getBoundingClientRect();
        ox += rect.left;
        oy += rect.top;
        doc = host.contentDocument;
    }}

    const collapse = (text) => (text || '').replace(/\s+/g, ' ').trim();

    function deepCollect(root) {{
        const all = [];
        const visit = (scope) => {{
            for (const el of scope.querySelectorAll('*')) {{
                all.push(el);
                if (el.shadowRoot) visit(el.shadowRoot);
            }}
        }};
        visit(root);
        return all;
    }}

    function isVisible(el) {{
        const win = el.ownerDocument.defaultView || window;
        const style = win.getComputedStyle(el);
        if (!style || style.display === 'none' || style.visibility === 'hidden') return false;
        if (parseFloat(style.opacity) === 0) return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    }}

    function computedRole(el) {{
        const explicit = (el.getAttribute('role') || '').toLowerCase();
        if (explicit) return explicit;
        const tag = el.tagName.toLowerCase();
        if (tag === 'button') return 'button';
        if (tag === 'a' && el.hasAttribute('href')) return 'link';
        if (tag === 'select') return 'combobox';
        if (tag === 'textarea') return 'textbox';
        if (tag === 'input') {{
            const type = (el.getAttribute('type') || '').toLowerCase();
            if (type === 'checkbox') return 'checkbox';
            if (type === 'radio') return 'radio';
            return 'textbox';
        }}
        return null;
    }}

    function accessibleName(el) {{
        const aria = el.getAttribute('aria-label');
        if (aria) return collapse(aria);
        if (el.id) {{
            const labels = el.ownerDocument.querySelectorAll('label[for]');
            for (const label of labels) {{
                if (label.getAttribute('for') === el.id && collapse(label.innerText)) {{
                    return collapse(label.innerText);
                }}
            }}
        }}
        const wrapping = el.closest && el.closest('label');
        if (wrapping && collapse(wrapping.innerText)) return collapse(wrapping.innerText);
        const text = collapse(el.innerText !== undefined ? el.innerText : el.textContent);
        if (text) return text;
        if (el.getAttribute('placeholder')) return collapse(el.getAttribute('placeholder'));
        if (el.getAttribute('name')) return el.getAttribute('name');
        return el.id || '';
    }}

    {matcher}

    const visible = matches.filter(isVisible);
    if (matches.length !== 1 || visible.length !== 1) {{
        return {{ count: matches.length, visibleCount: visible.length }};
    }}
    const el = visible[0];
    const arena = window.__flashNodes || (window.__flashNodes = []);
    const index = arena.length;
    arena.push(el);
    const rect = el.getBoundingClientRect();
    return {{
        count: 1,
        visibleCount: 1,
        index,
        cx: ox + rect.left + rect.width / 2,
        cy: oy + rect.top + rect.height / 2,
    }};
}})()
"#
    )
}

/// JS statement defining `matches` for one candidate kind.
fn matcher_fragment(candidate: &Candidate) -> String {
    match candidate {
        Candidate::TestId(value) => {
            let value = js_literal(value);
            format!(
                "const matches = deepCollect(doc).filter((el) => \
                 el.getAttribute('data-testid') === {value});"
            )
        }
        Candidate::Role { role, name } => {
            let role = js_literal(role);
            let name = js_literal(name);
            format!(
                "const matches = deepCollect(doc).filter((el) => \
                 computedRole(el) === {role} && accessibleName(el) === {name});"
            )
        }
        Candidate::Placeholder(value) => {
            let value = js_literal(value);
            format!(
                "const matches = deepCollect(doc).filter((el) => \
                 el.getAttribute('placeholder') === {value});"
            )
        }
        Candidate::Text(value) => {
            let value = js_literal(value);
            format!(
                "const textMatches = deepCollect(doc).filter((el) => \
                 collapse(el.innerText !== undefined ? el.innerText : el.textContent) === {value});\n    \
                 const matches = textMatches.filter((el) => \
                 !textMatches.some((other) => other !== el && el.contains(other)));"
            )
        }
        Candidate::XPath(xpath) => {
            let xpath = js_literal(xpath);
            format!(
                "const result = doc.evaluate({xpath}, doc, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);\n    \
                 const matches = [];\n    \
                 for (let i = 0; i < result.snapshotLength; i++) matches.push(result.snapshotItem(i));"
            )
        }
    }
}

/// Encode a value as a JavaScript string literal.
fn js_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
