//! Driver-error translation.
//!
//! Raw driver errors are useless to the planner ("Protocol error
//! (Runtime.callFunctionOn): ..."). This maps them to a category label plus
//! concrete next-step guidance that works as planner input. First substring
//! match wins.

const UNKNOWN_DETAIL_MAX: usize = 200;

/// Translate a raw driver error into planner-actionable advice.
pub fn translate_driver_error(raw: &str) -> String {
    let lower = raw.to_lowercase();

    if lower.contains("timeout") || lower.contains("timed out") {
        return "Timeout: the element or page did not respond in time. Wait for the page to \
                settle, scroll the target into view, or try a different element."
            .to_string();
    }
    if lower.contains("intercepts pointer events") || lower.contains("intercepted") {
        return "Click-intercepted: another element (overlay, modal, cookie banner) is covering \
                the target. Close or dismiss the covering element first, then retry."
            .to_string();
    }
    if lower.contains("detached") || lower.contains("stale") || lower.contains("no node with given id")
    {
        return "Detached: the element was removed or replaced after it was observed. The page \
                has changed; act on the fresh element list from the new observation."
            .to_string();
    }
    if lower.contains("not visible") || lower.contains("hidden") || lower.contains("has no size") {
        return "Not-visible: the element exists but is hidden or zero-sized. Scroll it into \
                view or reveal it (expand a menu, close an overlay) before interacting."
            .to_string();
    }
    if lower.contains("net::") || lower.contains("navigation") || lower.contains("err_") {
        return "Navigation-failed: the page could not be loaded. Check the URL is correct and \
                reachable, or go back and take a different route."
            .to_string();
    }

    let mut detail: String = raw.chars().take(UNKNOWN_DETAIL_MAX).collect();
    if raw.chars().count() > UNKNOWN_DETAIL_MAX {
        detail.push_str("...");
    }
    format!("Unknown error: {detail}. Try a different approach to the same goal.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_category() {
        let advice = translate_driver_error("Waiting for selector timed out after 30000ms");
        assert!(advice.starts_with("Timeout:"));
    }

    #[test]
    fn test_intercepted_category() {
        let advice =
            translate_driver_error("<div class=\"modal\"> intercepts pointer events at (10,20)");
        assert!(advice.starts_with("Click-intercepted:"));
        assert!(advice.contains("overlay"));
    }

    #[test]
    fn test_detached_category() {
        assert!(translate_driver_error("Node is detached from document").starts_with("Detached:"));
        assert!(translate_driver_error("stale element reference").starts_with("Detached:"));
    }

    #[test]
    fn test_first_match_wins() {
        // Contains both "timeout" and "navigation"; timeout is checked first.
        let advice = translate_driver_error("navigation timeout exceeded");
        assert!(advice.starts_with("Timeout:"));
    }

    #[test]
    fn test_unknown_truncates() {
        let raw = "x".repeat(500);
        let advice = translate_driver_error(&raw);
        assert!(advice.starts_with("Unknown error:"));
        assert!(advice.contains(&"x".repeat(200)));
        assert!(!advice.contains(&"x".repeat(201)));
        assert!(advice.contains("..."));
    }
}
