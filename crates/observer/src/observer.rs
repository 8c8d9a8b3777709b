//! The observer proper: settle, extract, identify, render.

use std::time::Duration;

use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use flashloop_core_types::{semantic_hash8, ElementInfo, SelectorSet, SemanticIdentity};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogEntry, Observation};
use crate::extract::{PageSnapshot, RawElement, EXTRACT_SCRIPT};

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("driver error: {0}")]
    Driver(String),

    #[error("could not decode page snapshot: {0}")]
    Decode(String),
}

const DOMCONTENTLOADED_TIMEOUT: Duration = Duration::from_secs(2);
const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_millis(500);

const DOMCONTENTLOADED_SCRIPT: &str = r#"
new Promise((resolve) => {
    if (document.readyState !== 'loading') { resolve(true); return; }
    document.addEventListener('DOMContentLoaded', () => resolve(true), { once: true });
})
"#;

/// Produces `(symbolic state, element catalog)` for the active page.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observer;

impl Observer {
    pub fn new() -> Self {
        Self
    }

    pub async fn observe(&self, page: &Page) -> Result<Observation, ObserverError> {
        self.settle(page).await;

        let snapshot = self.extract(page).await?;
        debug!(
            url = %snapshot.url,
            elements = snapshot.elements.len(),
            "page snapshot captured"
        );

        let ids = assign_ids(&snapshot.elements);
        let entries: Vec<(String, CatalogEntry)> = snapshot
            .elements
            .iter()
            .zip(ids)
            .map(|(raw, id)| {
                let entry = CatalogEntry {
                    info: to_info(raw, &id),
                    node_index: raw.index,
                    center: (raw.cx, raw.cy),
                };
                (id, entry)
            })
            .collect();

        let state_text = render_state_text(
            &snapshot.url,
            &snapshot.title,
            entries.iter().map(|(_, entry)| &entry.info),
        );

        Ok(Observation {
            state_text,
            catalog: Catalog::new(page.clone(), entries),
        })
    }

    /// Wait for `DOMContentLoaded` (capped) and then give in-flight network
    /// a short chance to drain. Both waits are best-effort; a page that
    /// never settles is still observed.
    async fn settle(&self, page: &Page) {
        let params = EvaluateParams::builder()
            .expression(DOMCONTENTLOADED_SCRIPT)
            .await_promise(true)
            .return_by_value(true)
            .build();
        if let Ok(params) = params {
            let wait = tokio::time::timeout(DOMCONTENTLOADED_TIMEOUT, page.evaluate(params)).await;
            if let Ok(Err(err)) = wait {
                warn!("domcontentloaded wait failed: {err}");
            }
        }
        let _ = tokio::time::timeout(NETWORK_IDLE_TIMEOUT, page.wait_for_navigation()).await;
    }

    async fn extract(&self, page: &Page) -> Result<PageSnapshot, ObserverError> {
        let params = EvaluateParams::builder()
            .expression(EXTRACT_SCRIPT)
            .return_by_value(true)
            .build()
            .map_err(ObserverError::Driver)?;
        let result = page
            .evaluate(params)
            .await
            .map_err(|err| ObserverError::Driver(err.to_string()))?;
        result
            .into_value()
            .map_err(|err| ObserverError::Decode(err.to_string()))
    }
}

/// Semantic IDs for a snapshot, in document order. Elements with the same
/// hash get ascending occurrence indices.
pub fn assign_ids(elements: &[RawElement]) -> Vec<String> {
    use std::collections::HashMap;

    let mut seen: HashMap<String, u32> = HashMap::new();
    elements
        .iter()
        .map(|raw| {
            let identity = SemanticIdentity {
                tag: &raw.tag,
                test_id: raw.test_id.as_deref(),
                role: raw.role.as_deref(),
                input_type: raw.input_type.as_deref(),
                placeholder: raw.placeholder.as_deref(),
                name: raw.name.as_deref(),
                text: raw.text.as_deref(),
            };
            let stem = format!("{}-{}", raw.tag, semantic_hash8(&identity));
            let occurrence = seen.entry(stem.clone()).or_insert(0);
            let id = format!("{stem}-{occurrence}");
            *occurrence += 1;
            id
        })
        .collect()
}

/// Human-readable label for the state text: the first identity-bearing
/// attribute the element has.
fn describe(raw: &RawElement) -> String {
    [
        raw.text.as_deref(),
        raw.aria_label.as_deref(),
        raw.placeholder.as_deref(),
        raw.title.as_deref(),
        raw.alt.as_deref(),
        raw.name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|value| !value.is_empty())
    .unwrap_or("")
    .to_string()
}

/// Approximate accessible name, mirroring the synthesizer's probe: label
/// first, visible text next, then attribute fallbacks down to the DOM id.
fn accessible_name(raw: &RawElement) -> Option<String> {
    [
        raw.aria_label.as_deref(),
        raw.text.as_deref().filter(|text| *text != "[REDACTED]"),
        raw.placeholder.as_deref(),
        raw.name.as_deref(),
        raw.dom_id.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|value| !value.is_empty())
    .map(str::to_string)
}

fn to_info(raw: &RawElement, id: &str) -> ElementInfo {
    ElementInfo {
        id: id.to_string(),
        tag_name: raw.tag.clone(),
        input_type: raw.input_type.clone(),
        name: raw.name.clone(),
        description: describe(raw),
        selectors: SelectorSet {
            test_id: raw.test_id.clone(),
            role: raw.role.clone(),
            role_name: accessible_name(raw),
            placeholder: raw.placeholder.clone(),
            text: raw.text.clone().filter(|text| text != "[REDACTED]"),
            aria_label: raw.aria_label.clone(),
            title: raw.title.clone(),
            alt: raw.alt.clone(),
        },
        xpath: raw.xpath.clone(),
        frame_chain: raw.chain.clone(),
        is_scrollable: raw.scrollable,
        is_in_viewport: raw.in_viewport,
        is_sensitive: raw.sensitive,
    }
}

/// The symbolic state: URL and title, one line per in-viewport element, and
/// a trailing count of off-screen elements to prompt scrolling.
pub fn render_state_text<'a>(
    url: &str,
    title: &str,
    infos: impl Iterator<Item = &'a ElementInfo>,
) -> String {
    let mut lines = vec![format!("URL: {url}"), format!("Title: {title}"), String::new()];
    let mut offscreen = 0usize;

    for info in infos {
        if info.is_in_viewport {
            lines.push(info.state_line());
        } else {
            offscreen += 1;
        }
    }
    if offscreen > 0 {
        lines.push(format!(
            "... ({offscreen} more items are not visible. Use 'scroll' to explore.)"
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(tag: &str, text: Option<&str>, in_viewport: bool, index: u32) -> RawElement {
        RawElement {
            index,
            tag: tag.to_string(),
            input_type: None,
            name: None,
            dom_id: None,
            test_id: None,
            aria_label: None,
            placeholder: None,
            title: None,
            alt: None,
            role: None,
            text: text.map(str::to_string),
            sensitive: false,
            scrollable: false,
            in_viewport,
            xpath: format!("/html[1]/body[1]/{tag}[{}]", index + 1),
            chain: Vec::new(),
            cx: 0.0,
            cy: 0.0,
        }
    }

    #[test]
    fn test_ids_unique_within_observation() {
        let elements = vec![
            raw("button", Some("Go"), true, 0),
            raw("button", Some("Go"), true, 1),
            raw("button", Some("Stop"), true, 2),
        ];
        let ids = assign_ids(&elements);
        assert_eq!(ids.len(), 3);
        assert_eq!(
            ids.iter().collect::<std::collections::HashSet<_>>().len(),
            3
        );
        // Same identity hash, distinct occurrence.
        assert_eq!(ids[0][..ids[0].len() - 2], ids[1][..ids[1].len() - 2]);
        assert!(ids[0].ends_with("-0"));
        assert!(ids[1].ends_with("-1"));
    }

    #[test]
    fn test_ids_stable_across_rescan() {
        let elements = vec![raw("a", Some("Docs"), true, 0), raw("a", Some("Blog"), true, 1)];
        let first = assign_ids(&elements);
        let second = assign_ids(&elements);
        assert_eq!(first, second);
    }

    #[test]
    fn test_describe_priority() {
        let mut element = raw("input", None, true, 0);
        element.placeholder = Some("Search".into());
        element.name = Some("q".into());
        assert_eq!(describe(&element), "Search");
        element.text = Some("typed".into());
        assert_eq!(describe(&element), "typed");
    }

    #[test]
    fn test_state_text_hides_offscreen() {
        let elements = vec![
            raw("button", Some("Visible"), true, 0),
            raw("button", Some("Below fold"), false, 1),
            raw("button", Some("Also below"), false, 2),
        ];
        let ids = assign_ids(&elements);
        let infos: Vec<ElementInfo> = elements
            .iter()
            .zip(&ids)
            .map(|(raw, id)| to_info(raw, id))
            .collect();
        let text = render_state_text("https://example.com", "Example", infos.iter());

        assert!(text.starts_with("URL: https://example.com\nTitle: Example"));
        assert!(text.contains("\"Visible\""));
        assert!(!text.contains("Below fold"));
        assert!(text.contains("... (2 more items are not visible. Use 'scroll' to explore.)"));
    }

    #[test]
    fn test_state_ids_all_in_catalog_order() {
        // Coverage invariant: every ID rendered in the state text exists in
        // the catalog built from the same snapshot.
        let elements = vec![
            raw("button", Some("One"), true, 0),
            raw("a", Some("Two"), true, 1),
        ];
        let ids = assign_ids(&elements);
        let infos: Vec<ElementInfo> = elements
            .iter()
            .zip(&ids)
            .map(|(raw, id)| to_info(raw, id))
            .collect();
        let text = render_state_text("u", "t", infos.iter());
        for id in &ids {
            assert!(text.contains(&format!("[ID: {id}]")));
        }
    }

    #[test]
    fn test_sensitive_text_not_used_as_text_selector() {
        let mut element = raw("input", Some("[REDACTED]"), true, 0);
        element.input_type = Some("password".into());
        element.sensitive = true;
        let info = to_info(&element, "input-deadbeef-0");
        assert!(info.selectors.text.is_none());
        assert!(info.is_sensitive);
        assert_eq!(info.description, "[REDACTED]");
    }

    #[test]
    fn test_empty_snapshot_still_renders() {
        let text = render_state_text("about:blank", "", std::iter::empty());
        assert!(text.starts_with("URL: about:blank"));
    }
}
