//! Selector synthesis with the double-check policy: a selector is only used
//! if, on the live page at this very moment, it matches exactly one visible
//! element. The accepted candidate doubles as the locator expression of the
//! recorded script.

pub mod candidates;
pub mod code;
pub mod synthesizer;

pub use candidates::{candidates_for, Candidate};
pub use code::{escape_single_quoted, locator_expression};
pub use synthesizer::{LocatorError, Synthesizer, VerifiedTarget};
