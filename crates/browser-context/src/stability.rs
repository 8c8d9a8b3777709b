//! DOM quiescence detection.
//!
//! A `MutationObserver` installed in the page watches for activity and the
//! waiter resolves once the DOM has been idle for `stability_duration`.
//! Perpetual-motion mutations (video frames, spinner class flips,
//! `aria-busy` churn) must not hold the agent hostage, so batches in which
//! *every* record targets a known noise source do not reset the idle timer.

use std::time::Duration;

use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ContextError;

/// Outcome of one wait: whether the idle window was reached and how long the
/// whole wait took (milliseconds, page clock).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StabilityOutcome {
    pub achieved: bool,
    pub duration: u64,
}

/// Tuning for [`StabilityWaiter`].
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Minimum idle time required to declare the DOM stable.
    pub stability_duration: Duration,
    /// Soft cap on the whole wait.
    pub max_timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            stability_duration: Duration::from_millis(300),
            max_timeout: Duration::from_millis(2_000),
        }
    }
}

const STABILITY_SCRIPT: &str = r#"
(() => {
    const stabilityMs = __STABILITY_MS__;
    const maxMs = __MAX_MS__;
    return new Promise((resolve) => {
        if (!document.body) {
            resolve({ achieved: false, duration: 0 });
            return;
        }
        const start = Date.now();
        const NOISY_TAGS = ['VIDEO', 'AUDIO', 'SVG', 'PATH', 'CANVAS'];
        const NOISY_HINTS = ['spinner', 'loader', 'loading', 'progress', 'busy'];

        function isNoisy(target) {
            const el = target.nodeType === Node.ELEMENT_NODE ? target : target.parentElement;
            if (!el) return false;
            if (NOISY_TAGS.includes(el.tagName)) return true;
            const cls = typeof el.className === 'string'
                ? el.className
                : (el.className && el.className.baseVal) || '';
            const marker = (cls + ' ' + (el.id || '')).toLowerCase();
            if (NOISY_HINTS.some((hint) => marker.includes(hint))) return true;
            if (el.getAttribute && el.getAttribute('aria-busy') === 'true') return true;
            if (el.attributes) {
                for (const attr of el.attributes) {
                    if (attr.name.startsWith('data-loading')) return true;
                }
            }
            return false;
        }

        let idleTimer = null;
        let done = false;
        const finish = (achieved) => {
            if (done) return;
            done = true;
            observer.disconnect();
            clearTimeout(idleTimer);
            clearTimeout(capTimer);
            resolve({ achieved, duration: Date.now() - start });
        };
        const arm = () => {
            clearTimeout(idleTimer);
            idleTimer = setTimeout(() => finish(true), stabilityMs);
        };

        const observer = new MutationObserver((records) => {
            if (records.every((record) => isNoisy(record.target))) return;
            arm();
        });
        observer.observe(document.body, {
            childList: true,
            subtree: true,
            attributes: true,
            characterData: true,
        });

        const capTimer = setTimeout(() => finish(false), maxMs);
        arm();
    });
})()
"#;

/// Waits for the active page's DOM to stop mutating.
#[derive(Debug, Clone, Copy, Default)]
pub struct StabilityWaiter {
    options: WaitOptions,
}

impl StabilityWaiter {
    pub fn new(options: WaitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> WaitOptions {
        self.options
    }

    /// Block until the DOM has been idle for `stability_duration`, or give
    /// up after `max_timeout`. Navigation tearing the page down mid-wait is
    /// normal, not an error; it resolves as not-achieved.
    pub async fn wait_for_stable(&self, page: &Page) -> Result<StabilityOutcome, ContextError> {
        let script = STABILITY_SCRIPT
            .replace(
                "__STABILITY_MS__",
                &self.options.stability_duration.as_millis().to_string(),
            )
            .replace("__MAX_MS__", &self.options.max_timeout.as_millis().to_string());

        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(ContextError::Driver)?;

        match page.evaluate(params).await {
            Ok(result) => {
                let outcome: StabilityOutcome = result
                    .into_value()
                    .map_err(ContextError::driver)?;
                debug!(achieved = outcome.achieved, duration_ms = outcome.duration, "stability wait done");
                Ok(outcome)
            }
            Err(err) if is_teardown_error(&err.to_string()) => Ok(StabilityOutcome {
                achieved: false,
                duration: 0,
            }),
            Err(err) => Err(ContextError::driver(err)),
        }
    }
}

/// The wait races page navigation by design; these failures mean the page
/// went away under us, not that anything is wrong.
fn is_teardown_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("navigation")
        || lower.contains("target closed")
        || lower.contains("context was destroyed")
        || lower.contains("context destroyed")
        || lower.contains("cannot find context")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let options = WaitOptions::default();
        assert_eq!(options.stability_duration, Duration::from_millis(300));
        assert_eq!(options.max_timeout, Duration::from_millis(2_000));
    }

    #[test]
    fn test_script_substitution() {
        let script = STABILITY_SCRIPT
            .replace("__STABILITY_MS__", "300")
            .replace("__MAX_MS__", "2000");
        assert!(script.contains("const stabilityMs = 300;"));
        assert!(script.contains("const maxMs = 2000;"));
        assert!(!script.contains("__STABILITY_MS__"));
    }

    #[test]
    fn test_noise_hints_cover_spec_markers() {
        for hint in ["spinner", "loader", "loading", "progress", "busy"] {
            assert!(STABILITY_SCRIPT.contains(&format!("'{hint}'")));
        }
        for tag in ["VIDEO", "AUDIO", "SVG", "PATH", "CANVAS"] {
            assert!(STABILITY_SCRIPT.contains(&format!("'{tag}'")));
        }
    }

    #[test]
    fn test_teardown_error_classification() {
        assert!(is_teardown_error("Execution context was destroyed"));
        assert!(is_teardown_error("navigation interrupted the evaluation"));
        assert!(is_teardown_error("Target closed"));
        assert!(!is_teardown_error("ReferenceError: x is not defined"));
    }

    #[test]
    fn test_outcome_deserializes() {
        let outcome: StabilityOutcome =
            serde_json::from_str(r#"{"achieved": true, "duration": 412}"#).unwrap();
        assert!(outcome.achieved);
        assert_eq!(outcome.duration, 412);
    }
}
