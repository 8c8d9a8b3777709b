//! The closed set of actions the planner may request.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Every action the executor knows how to dispatch.
///
/// The set is closed on purpose: the planner prompt enumerates exactly these
/// variants and the executor rejects anything else before touching the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    Dblclick,
    RightClick,
    Hover,
    Focus,
    Fill,
    Type,
    Clear,
    Check,
    Uncheck,
    SelectOption,
    Upload,
    DragAndDrop,
    Keypress,
    Navigate,
    Reload,
    GoBack,
    Scroll,
    SwitchTab,
    CloseTab,
    WaitForElement,
    HandleDialog,
    AssertVisible,
    AssertText,
    AssertValue,
    AssertUrl,
    Finish,
}

impl ActionType {
    /// Actions that complete the task without touching the page.
    pub fn is_meta(self) -> bool {
        matches!(self, ActionType::Finish)
    }

    /// Actions that operate on the page set or dialog state rather than a
    /// single element.
    pub fn is_context(self) -> bool {
        matches!(
            self,
            ActionType::SwitchTab
                | ActionType::CloseTab
                | ActionType::HandleDialog
                | ActionType::WaitForElement
        )
    }

    /// Top-level navigation actions.
    pub fn is_navigation(self) -> bool {
        matches!(
            self,
            ActionType::Navigate | ActionType::Reload | ActionType::GoBack
        )
    }

    /// Whether this action requires a `targetId` resolved from the current
    /// catalog. `scroll` is the exception in its band: without a target it
    /// scrolls the page itself.
    pub fn requires_target(self) -> bool {
        !self.is_meta()
            && !self.is_context()
            && !self.is_navigation()
            && !matches!(self, ActionType::Scroll | ActionType::AssertUrl)
    }

    /// Whether this action requires a non-empty `value` parameter.
    pub fn requires_value(self) -> bool {
        matches!(
            self,
            ActionType::Fill
                | ActionType::Type
                | ActionType::SelectOption
                | ActionType::Upload
                | ActionType::Keypress
                | ActionType::Navigate
                | ActionType::SwitchTab
                | ActionType::HandleDialog
                | ActionType::AssertText
                | ActionType::AssertValue
                | ActionType::AssertUrl
        )
    }

    /// Wire name, as the planner spells it.
    pub fn name(self) -> &'static str {
        match self {
            ActionType::Click => "click",
            ActionType::Dblclick => "dblclick",
            ActionType::RightClick => "right_click",
            ActionType::Hover => "hover",
            ActionType::Focus => "focus",
            ActionType::Fill => "fill",
            ActionType::Type => "type",
            ActionType::Clear => "clear",
            ActionType::Check => "check",
            ActionType::Uncheck => "uncheck",
            ActionType::SelectOption => "select_option",
            ActionType::Upload => "upload",
            ActionType::DragAndDrop => "drag_and_drop",
            ActionType::Keypress => "keypress",
            ActionType::Navigate => "navigate",
            ActionType::Reload => "reload",
            ActionType::GoBack => "go_back",
            ActionType::Scroll => "scroll",
            ActionType::SwitchTab => "switch_tab",
            ActionType::CloseTab => "close_tab",
            ActionType::WaitForElement => "wait_for_element",
            ActionType::HandleDialog => "handle_dialog",
            ActionType::AssertVisible => "assert_visible",
            ActionType::AssertText => "assert_text",
            ActionType::AssertValue => "assert_value",
            ActionType::AssertUrl => "assert_url",
            ActionType::Finish => "finish",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
