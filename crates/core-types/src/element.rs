//! Serializable element description produced by the observer.

use serde::{Deserialize, Serialize};

/// Locator candidates captured for one element. Any subset may be present;
/// the synthesizer tries them in a fixed order and verifies on the live page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSet {
    /// `data-testid` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,

    /// ARIA role, explicit or implied from the tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Accessible name used together with `role`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    /// Exact visible text, whitespace-collapsed, at most 50 chars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// The driver-independent part of an element descriptor.
///
/// The live handle (an index into the per-observation page arena) is owned by
/// the observer's catalog, not by this struct, so plans, logs and tests can
/// carry `ElementInfo` freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    /// Stable semantic identifier, `<tag>-<hash8>-<occurrence>`.
    pub id: String,

    pub tag_name: String,

    /// `type` attribute for inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,

    /// `name` attribute; feeds the semantic hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Human-readable label shown in the symbolic state.
    pub description: String,

    pub selectors: SelectorSet,

    /// Deterministic index-based path, the last-resort locator.
    pub xpath: String,

    /// Iframe selectors from the root document down to the host frame.
    #[serde(default)]
    pub frame_chain: Vec<String>,

    #[serde(default)]
    pub is_scrollable: bool,

    #[serde(default)]
    pub is_in_viewport: bool,

    /// Password/email/payment inputs; their text never leaves the page
    /// unredacted.
    #[serde(default)]
    pub is_sensitive: bool,
}

impl ElementInfo {
    /// State-text line for this element, description clamped to 60 chars.
    pub fn state_line(&self) -> String {
        let mut label = self.tag_name.clone();
        if let Some(input_type) = &self.input_type {
            label.push_str(&format!("[type={input_type}]"));
        }
        let description: String = self.description.chars().take(60).collect();
        let mut line = format!("- {label} \"{description}\" [ID: {}]", self.id);

        let mut notes = Vec::new();
        if self.is_scrollable {
            notes.push("Scrollable");
        }
        if !self.frame_chain.is_empty() {
            notes.push("in Iframe");
        }
        if !notes.is_empty() {
            line.push_str(&format!(" ({})", notes.join(", ")));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ElementInfo {
        ElementInfo {
            id: "button-1a2b3c4d-0".into(),
            tag_name: "button".into(),
            input_type: None,
            name: None,
            description: "Login".into(),
            selectors: SelectorSet {
                role: Some("button".into()),
                role_name: Some("Login".into()),
                ..Default::default()
            },
            xpath: "/html/body/form/button[1]".into(),
            frame_chain: Vec::new(),
            is_scrollable: false,
            is_in_viewport: true,
            is_sensitive: false,
        }
    }

    #[test]
    fn test_state_line_plain() {
        assert_eq!(
            sample().state_line(),
            "- button \"Login\" [ID: button-1a2b3c4d-0]"
        );
    }

    #[test]
    fn test_state_line_annotations() {
        let mut info = sample();
        info.tag_name = "input".into();
        info.input_type = Some("text".into());
        info.is_scrollable = true;
        info.frame_chain = vec!["iframe[name=\"embed\"]".into()];
        let line = info.state_line();
        assert!(line.starts_with("- input[type=text] \"Login\""));
        assert!(line.ends_with("(Scrollable, in Iframe)"));
    }

    #[test]
    fn test_description_clamped() {
        let mut info = sample();
        info.description = "x".repeat(90);
        let line = info.state_line();
        assert!(line.contains(&"x".repeat(60)));
        assert!(!line.contains(&"x".repeat(61)));
    }
}
