//! The planner's structured output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::action::ActionType;

/// One decision from the planner: what to do next, against which element,
/// with which parameter.
///
/// Field names are camelCase on the wire because that is the shape the LLM
/// is prompted to produce.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    /// Free-text reasoning about the current state.
    #[serde(default)]
    pub thought: String,

    /// Adaptive multi-step outlook; optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<AdaptivePlan>,

    /// The action to perform.
    pub action_type: ActionType,

    /// Semantic ID of the target element, for element actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    /// Second target, only for drag_and_drop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id2: Option<String>,

    /// Action parameter: text, URL, key name, file path, tab selector,
    /// or "accept"/"dismiss" for dialogs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Set when the goal has been reached.
    #[serde(default)]
    pub is_finished: bool,
}

/// Rolling plan the LLM maintains across steps.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdaptivePlan {
    /// Where the task stands right now.
    #[serde(default)]
    pub current_status: String,

    /// Up to three upcoming steps.
    #[serde(default)]
    pub remaining_steps: Vec<String>,

    /// True when reality diverged and the plan was rewritten.
    #[serde(default)]
    pub is_plan_changed: bool,
}

impl ActionPlan {
    /// Minimal plan used by tests and the mock planner.
    pub fn action(action_type: ActionType) -> Self {
        Self {
            thought: String::new(),
            plan: None,
            action_type,
            target_id: None,
            target_id2: None,
            value: None,
            is_finished: matches!(action_type, ActionType::Finish),
        }
    }

    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// One-line rendering for logs and the interactive gate.
    pub fn summary(&self) -> String {
        let mut out = self.action_type.name().to_string();
        if let Some(target) = &self.target_id {
            out.push_str(&format!(" {target}"));
        }
        if let Some(value) = &self.value {
            out.push_str(&format!(" \"{value}\""));
        }
        out
    }
}
