//! Outcome of a single executed action.

use serde::{Deserialize, Serialize};

/// What the executor hands back to the loop after one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,

    /// Playwright statement reproducing the action; present only when the
    /// embedded locator was verified unique-and-visible at execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<String>,

    /// Translated error, when the action failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Advisory text fed back into the next planning round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_guidance: Option<String>,

    /// False only for input errors more context will not fix (missing
    /// required field, unknown action, ID not in catalog).
    pub retryable: bool,
}

impl ExecutionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            generated_code: None,
            error: None,
            user_guidance: None,
            retryable: true,
        }
    }

    pub fn ok_with_code(code: impl Into<String>) -> Self {
        Self {
            generated_code: Some(code.into()),
            ..Self::ok()
        }
    }

    pub fn failed(error: impl Into<String>, retryable: bool) -> Self {
        let error = error.into();
        Self {
            success: false,
            generated_code: None,
            user_guidance: Some(error.clone()),
            error: Some(error),
            retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_carries_code() {
        let result = ExecutionResult::ok_with_code("await page.reload();");
        assert!(result.success);
        assert_eq!(result.generated_code.as_deref(), Some("await page.reload();"));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_failure_mirrors_guidance() {
        let result = ExecutionResult::failed("Timeout: wait or retry", true);
        assert!(!result.success);
        assert_eq!(result.error, result.user_guidance);
        assert!(result.retryable);
    }
}
