//! Error types for context management.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    /// No page is open in the browser context.
    #[error("no pages are open")]
    NoPages,

    /// Tab index outside the open page range.
    #[error("tab index {index} out of range (0..{count})")]
    TabIndexOutOfRange { index: usize, count: usize },

    /// No open tab's title or URL contains the query.
    #[error("no tab matching '{0}' was found")]
    TabNotFound(String),

    /// `handle_dialog` was issued with no dialog pending.
    #[error("no pending dialog to handle")]
    NoPendingDialog,

    /// Underlying driver failure.
    #[error("driver error: {0}")]
    Driver(String),
}

impl ContextError {
    pub fn driver(err: impl std::fmt::Display) -> Self {
        Self::Driver(err.to_string())
    }
}
