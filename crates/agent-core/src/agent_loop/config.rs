//! Configuration for the agent loop.

use std::path::PathBuf;

use flashloop_browser_context::WaitOptions;

/// Tuning for one agent run.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Hard cap on observe-think-act iterations.
    /// Default: 20
    pub max_steps: u32,

    /// Retryable failures in a row before the loop gives up.
    /// Default: 3
    pub max_consecutive_failures: u32,

    /// Present each plan to the operator before executing.
    pub interactive: bool,

    /// Launch the owned browser without a window.
    pub headless: bool,

    /// Where the owned browser navigates first.
    pub start_url: Option<String>,

    /// Directory for recorded scripts in owned mode.
    pub output_dir: PathBuf,

    /// DOM quiescence timings used after each action.
    pub stability: WaitOptions,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            max_consecutive_failures: 3,
            interactive: false,
            headless: true,
            start_url: None,
            output_dir: PathBuf::from("."),
            stability: WaitOptions::default(),
        }
    }
}

impl LoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tight limits for tests.
    pub fn minimal() -> Self {
        Self {
            max_steps: 5,
            max_consecutive_failures: 2,
            ..Self::default()
        }
    }

    pub fn max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.max_steps, 20);
        assert_eq!(config.max_consecutive_failures, 3);
        assert!(config.headless);
        assert!(!config.interactive);
    }

    #[test]
    fn test_builder() {
        let config = LoopConfig::new()
            .max_steps(7)
            .interactive(true)
            .start_url("https://example.com");
        assert_eq!(config.max_steps, 7);
        assert!(config.interactive);
        assert_eq!(config.start_url.as_deref(), Some("https://example.com"));
    }
}
