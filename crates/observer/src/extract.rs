//! The in-page extraction script and its wire format.
//!
//! Everything that needs DOM access runs inside the page in one evaluation:
//! frame discovery, the interactability test, attribute capture, sensitive
//! redaction, XPath derivation and the handle arena. Only serializable data
//! crosses back; live nodes stay parked in `window.__flashNodes` and are
//! addressed by index.

use serde::Deserialize;

/// Name of the per-observation node arena on the top window. Installing a
/// fresh arena releases every handle from the previous observation.
pub const ELEMENT_ARENA_BINDING: &str = "__flashNodes";

/// One interactable element as reported by the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    /// Index into the arena; the element's live handle for this observation.
    pub index: u32,
    pub tag: String,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dom_id: Option<String>,
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Visible text, collapsed, max 50 chars; `[REDACTED]` for sensitive
    /// inputs — the real value never leaves the page context.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub scrollable: bool,
    #[serde(default)]
    pub in_viewport: bool,
    pub xpath: String,
    /// Iframe selectors from the root document down to this element's frame.
    #[serde(default)]
    pub chain: Vec<String>,
    /// Element center in root-viewport coordinates (frame offsets applied).
    pub cx: f64,
    pub cy: f64,
}

/// Whole-page snapshot returned by [`EXTRACT_SCRIPT`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

/// Walks every same-origin frame and shadow tree, collects interactable
/// elements in document order, and parks their nodes in the arena.
pub const EXTRACT_SCRIPT: &str = r#"
(() => {
    const MAX_TEXT = 50;
    const registry = [];
    window.__flashNodes = registry;
    const out = [];

    const INTERACTIVE_TAGS = ['button', 'a', 'input', 'select', 'textarea', 'details', 'summary'];
    const INTERACTIVE_ROLES = [
        'button', 'checkbox', 'combobox', 'link', 'menuitem', 'option', 'radio', 'slider',
        'spinbutton', 'switch', 'tab', 'textbox', 'treeitem', 'gridcell', 'heading'
    ];

    const collapse = (text) => (text || '').replace(/\s+/g, ' ').trim();

    function isVisible(el, win) {
        const style = win.getComputedStyle(el);
        if (!style || style.display === 'none' || style.visibility === 'hidden') return false;
        if (parseFloat(style.opacity) === 0) return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    }

    function isScrollable(el, win) {
        const style = win.getComputedStyle(el);
        return (style.overflowY === 'scroll' || style.overflowY === 'auto')
            && el.scrollHeight > el.clientHeight;
    }

    function isInteractable(el, win) {
        if (!isVisible(el, win)) return false;
        const tag = el.tagName.toLowerCase();
        if (INTERACTIVE_TAGS.includes(tag)) return true;
        const role = (el.getAttribute('role') || '').toLowerCase();
        if (INTERACTIVE_ROLES.includes(role)) return true;
        if (el.isContentEditable) return true;
        if (win.getComputedStyle(el).cursor === 'pointer') return true;
        return isScrollable(el, win);
    }

    function implicitRole(el) {
        const tag = el.tagName.toLowerCase();
        if (tag === 'button') return 'button';
        if (tag === 'a' && el.hasAttribute('href')) return 'link';
        if (tag === 'select') return 'combobox';
        if (tag === 'input') {
            const type = (el.getAttribute('type') || '').toLowerCase();
            if (type === 'checkbox') return 'checkbox';
            if (type === 'radio') return 'radio';
            return 'textbox';
        }
        if (tag === 'textarea') return 'textbox';
        return null;
    }

    function isSensitive(el) {
        const type = (el.getAttribute('type') || '').toLowerCase();
        if (['password', 'email', 'tel', 'credit-card'].includes(type)) return true;
        const autocomplete = (el.getAttribute('autocomplete') || '').toLowerCase();
        return autocomplete.includes('password')
            || autocomplete.includes('email')
            || autocomplete.includes('cc-');
    }

    function xpathFor(el) {
        if (el.id) return '//*[@id="' + el.id + '"]';
        const parts = [];
        let node = el;
        while (node && node.nodeType === Node.ELEMENT_NODE) {
            let index = 1;
            let sibling = node.previousElementSibling;
            while (sibling) {
                if (sibling.tagName === node.tagName) index += 1;
                sibling = sibling.previousElementSibling;
            }
            parts.unshift(node.tagName.toLowerCase() + '[' + index + ']');
            node = node.parentElement;
        }
        return '/' + parts.join('/');
    }

    function frameSelector(iframe) {
        const name = iframe.getAttribute('name');
        if (name) return 'iframe[name="' + name + '"]';
        if (iframe.id) return 'iframe[id="' + iframe.id + '"]';
        const src = (iframe.getAttribute('src') || '').split('?')[0];
        if (src) return 'iframe[src*="' + src + '"]';
        let index = 1;
        let sibling = iframe.previousElementSibling;
        while (sibling) {
            if (sibling.tagName === 'IFRAME') index += 1;
            sibling = sibling.previousElementSibling;
        }
        return 'iframe:nth-of-type(' + index + ')';
    }

    // Breadth-first frame discovery; cross-origin frames throw or hand back
    // a null document and are skipped.
    const frames = [{ doc: document, win: window, chain: [], ox: 0, oy: 0 }];
    for (let i = 0; i < frames.length; i++) {
        const frame = frames[i];
        for (const iframe of frame.doc.querySelectorAll('iframe')) {
            try {
                const doc = iframe.contentDocument;
                const win = iframe.contentWindow;
                if (!doc || !win) continue;
                const rect = iframe.getBoundingClientRect();
                frames.push({
                    doc,
                    win,
                    chain: frame.chain.concat([frameSelector(iframe)]),
                    ox: frame.ox + rect.left,
                    oy: frame.oy + rect.top,
                });
            } catch (err) {
                // cross-origin
            }
        }
    }

    const viewportW = window.innerWidth;
    const viewportH = window.innerHeight;

    function capture(el, frame) {
        const tag = el.tagName.toLowerCase();
        const sensitive = (tag === 'input' || tag === 'textarea') && isSensitive(el);
        let text = collapse(el.innerText !== undefined ? el.innerText : el.textContent)
            .slice(0, MAX_TEXT);
        if (sensitive) text = '[REDACTED]';

        const rect = el.getBoundingClientRect();
        const left = rect.left + frame.ox;
        const top = rect.top + frame.oy;
        const inViewport = top < viewportH && left < viewportW
            && top + rect.height > 0 && left + rect.width > 0;

        out.push({
            index: registry.length,
            tag,
            inputType: el.getAttribute('type') || null,
            name: el.getAttribute('name') || null,
            domId: el.id || null,
            testId: el.getAttribute('data-testid') || null,
            ariaLabel: el.getAttribute('aria-label') || null,
            placeholder: el.getAttribute('placeholder') || null,
            title: el.getAttribute('title') || null,
            alt: el.getAttribute('alt') || null,
            role: (el.getAttribute('role') || '').toLowerCase() || implicitRole(el),
            text: text || null,
            sensitive,
            scrollable: isScrollable(el, frame.win),
            inViewport,
            xpath: xpathFor(el),
            chain: frame.chain,
            cx: left + rect.width / 2,
            cy: top + rect.height / 2,
        });
        registry.push(el);
    }

    function walk(el, frame) {
        if (el.nodeType !== Node.ELEMENT_NODE) return;
        const tag = el.tagName.toLowerCase();
        if (['script', 'style', 'noscript', 'template'].includes(tag)) return;
        if (isInteractable(el, frame.win)) capture(el, frame);
        if (el.shadowRoot) {
            for (const child of el.shadowRoot.children) walk(child, frame);
        }
        for (const child of el.children) walk(child, frame);
    }

    for (const frame of frames) {
        const root = frame.doc.body || frame.doc.documentElement;
        if (root) walk(root, frame);
    }

    // Local uniqueness screen: a candidate that matches several elements is
    // noise for the planner; the synthesizer re-verifies survivors anyway.
    for (const key of ['testId', 'placeholder', 'text']) {
        const counts = new Map();
        for (const record of out) {
            const value = record[key];
            if (value) counts.set(value, (counts.get(value) || 0) + 1);
        }
        for (const record of out) {
            if (record[key] && counts.get(record[key]) > 1) record[key] = null;
        }
    }

    return {
        url: location.href,
        title: document.title,
        elements: out,
    };
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_element_decodes() {
        let raw = r#"{
            "index": 3,
            "tag": "input",
            "inputType": "password",
            "text": "[REDACTED]",
            "sensitive": true,
            "inViewport": true,
            "xpath": "/html[1]/body[1]/form[1]/input[2]",
            "chain": [],
            "cx": 120.5,
            "cy": 300.0
        }"#;
        let element: RawElement = serde_json::from_str(raw).unwrap();
        assert_eq!(element.index, 3);
        assert_eq!(element.text.as_deref(), Some("[REDACTED]"));
        assert!(element.sensitive);
        assert!(element.role.is_none());
    }

    #[test]
    fn test_snapshot_decodes_without_elements() {
        let snapshot: PageSnapshot =
            serde_json::from_str(r#"{"url": "about:blank", "title": ""}"#).unwrap();
        assert!(snapshot.elements.is_empty());
    }

    #[test]
    fn test_script_installs_arena() {
        assert!(EXTRACT_SCRIPT.contains(&format!("window.{ELEMENT_ARENA_BINDING} = registry")));
    }

    #[test]
    fn test_script_covers_spec_predicates() {
        // Interactable tags and roles from the observation contract.
        for tag in ["'button'", "'details'", "'summary'"] {
            assert!(EXTRACT_SCRIPT.contains(tag));
        }
        for role in ["'spinbutton'", "'treeitem'", "'gridcell'", "'heading'"] {
            assert!(EXTRACT_SCRIPT.contains(role));
        }
        assert!(EXTRACT_SCRIPT.contains("isContentEditable"));
        assert!(EXTRACT_SCRIPT.contains("cursor === 'pointer'"));
        assert!(EXTRACT_SCRIPT.contains("shadowRoot"));
        assert!(EXTRACT_SCRIPT.contains("'credit-card'"));
        assert!(EXTRACT_SCRIPT.contains("[REDACTED]"));
    }
}
