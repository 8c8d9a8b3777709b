//! Candidate ordering.
//!
//! User-visible, intention-revealing locators first; the deterministic XPath
//! is always present and always last.

use flashloop_core_types::ElementInfo;

/// One locator candidate, in the synthesizer's preference order.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    TestId(String),
    Role { role: String, name: String },
    Placeholder(String),
    Text(String),
    XPath(String),
}

impl Candidate {
    /// The XPath fallback trades readability for determinism; its use is
    /// flagged in the recorded script.
    pub fn is_last_resort(&self) -> bool {
        matches!(self, Candidate::XPath(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Candidate::TestId(_) => "test-id",
            Candidate::Role { .. } => "role",
            Candidate::Placeholder(_) => "placeholder",
            Candidate::Text(_) => "text",
            Candidate::XPath(_) => "xpath",
        }
    }
}

/// All candidates available for an element, best first.
pub fn candidates_for(info: &ElementInfo) -> Vec<Candidate> {
    let selectors = &info.selectors;
    let mut out = Vec::new();

    if let Some(test_id) = selectors.test_id.as_deref().filter(|v| !v.is_empty()) {
        out.push(Candidate::TestId(test_id.to_string()));
    }
    if let (Some(role), Some(name)) = (selectors.role.as_deref(), selectors.role_name.as_deref()) {
        if !role.is_empty() && !name.is_empty() {
            out.push(Candidate::Role {
                role: role.to_string(),
                name: name.to_string(),
            });
        }
    }
    if let Some(placeholder) = selectors.placeholder.as_deref().filter(|v| !v.is_empty()) {
        out.push(Candidate::Placeholder(placeholder.to_string()));
    }
    if let Some(text) = selectors.text.as_deref().filter(|v| !v.is_empty()) {
        out.push(Candidate::Text(text.to_string()));
    }
    out.push(Candidate::XPath(info.xpath.clone()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashloop_core_types::SelectorSet;

    fn info(selectors: SelectorSet) -> ElementInfo {
        ElementInfo {
            id: "button-12345678-0".into(),
            tag_name: "button".into(),
            input_type: None,
            name: None,
            description: String::new(),
            selectors,
            xpath: "/html[1]/body[1]/button[1]".into(),
            frame_chain: Vec::new(),
            is_scrollable: false,
            is_in_viewport: true,
            is_sensitive: false,
        }
    }

    #[test]
    fn test_full_order() {
        let candidates = candidates_for(&info(SelectorSet {
            test_id: Some("submit".into()),
            role: Some("button".into()),
            role_name: Some("Send".into()),
            placeholder: Some("p".into()),
            text: Some("Send".into()),
            ..Default::default()
        }));
        let labels: Vec<_> = candidates.iter().map(Candidate::label).collect();
        assert_eq!(labels, ["test-id", "role", "placeholder", "text", "xpath"]);
    }

    #[test]
    fn test_xpath_always_present_and_last() {
        let candidates = candidates_for(&info(SelectorSet::default()));
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_last_resort());
    }

    #[test]
    fn test_role_requires_name() {
        let candidates = candidates_for(&info(SelectorSet {
            role: Some("button".into()),
            role_name: None,
            ..Default::default()
        }));
        assert!(!candidates.iter().any(|c| matches!(c, Candidate::Role { .. })));
    }

    #[test]
    fn test_empty_values_skipped() {
        let candidates = candidates_for(&info(SelectorSet {
            test_id: Some(String::new()),
            placeholder: Some(String::new()),
            ..Default::default()
        }));
        assert_eq!(candidates.len(), 1);
    }
}
