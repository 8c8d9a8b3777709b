//! Browser context plumbing: which page is active, which dialog is pending,
//! and when the DOM has stopped moving.

pub mod dialogs;
pub mod errors;
pub mod manager;
pub mod stability;

pub use dialogs::{DialogChoice, DialogWatcher, PendingDialog};
pub use errors::ContextError;
pub use manager::ContextManager;
pub use stability::{StabilityOutcome, StabilityWaiter, WaitOptions};
