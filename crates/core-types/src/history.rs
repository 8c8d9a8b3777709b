//! Bounded record of past action outcomes.

/// FIFO of outcome lines, capped at [`HistoryLog::CAPACITY`]. Entries look
/// like `SUCCESS: click button-1a2b3c4d-0` or
/// `ERROR: fill failed. Timeout: ...`.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<String>,
}

impl HistoryLog {
    pub const CAPACITY: usize = 20;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
        if self.entries.len() > Self::CAPACITY {
            let overflow = self.entries.len() - Self::CAPACITY;
            self.entries.drain(..overflow);
        }
    }

    pub fn add_success(&mut self, action: &str) {
        self.add(format!("SUCCESS: {action}"));
    }

    pub fn add_error(&mut self, action: &str, guidance: &str) {
        self.add(format!("ERROR: {action} failed. {guidance}"));
    }

    /// Copy of the log, oldest first.
    pub fn get_history(&self) -> Vec<String> {
        self.entries.clone()
    }

    /// The `count` most recent entries, oldest of those first.
    pub fn recent(&self, count: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries[skip..].to_vec()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_at_capacity() {
        let mut log = HistoryLog::new();
        for i in 0..30 {
            log.add(format!("SUCCESS: step {i}"));
        }
        assert_eq!(log.len(), HistoryLog::CAPACITY);
        // Oldest entries were evicted.
        assert_eq!(log.get_history()[0], "SUCCESS: step 10");
        assert_eq!(log.get_history()[19], "SUCCESS: step 29");
    }

    #[test]
    fn test_recent_window() {
        let mut log = HistoryLog::new();
        for i in 0..8 {
            log.add(format!("entry {i}"));
        }
        let recent = log.recent(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0], "entry 3");
        assert_eq!(recent[4], "entry 7");
        assert_eq!(log.recent(100).len(), 8);
    }

    #[test]
    fn test_formatting_helpers() {
        let mut log = HistoryLog::new();
        log.add_success("click button-1a2b3c4d-0");
        log.add_error("fill input-9f8e7d6c-0", "Timeout: the page kept mutating");
        let history = log.get_history();
        assert_eq!(history[0], "SUCCESS: click button-1a2b3c4d-0");
        assert!(history[1].starts_with("ERROR: fill input-9f8e7d6c-0 failed."));
    }

    #[test]
    fn test_clear() {
        let mut log = HistoryLog::new();
        log.add("x");
        log.clear();
        assert!(log.is_empty());
    }
}
