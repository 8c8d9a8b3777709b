//! Shared data model for the flash-loop agent.
//!
//! Everything that crosses a component boundary lives here: the closed action
//! set the planner may emit, the plan and result shapes, the serializable
//! part of an element descriptor, the semantic-ID hash, the bounded history
//! log, and the driver-error translator.

pub mod action;
pub mod advice;
pub mod element;
pub mod hash;
pub mod history;
pub mod plan;
pub mod result;

pub use action::ActionType;
pub use advice::translate_driver_error;
pub use element::{ElementInfo, SelectorSet};
pub use hash::{fnv1a32, semantic_hash8, semantic_id, SemanticIdentity};
pub use history::HistoryLog;
pub use plan::{ActionPlan, AdaptivePlan};
pub use result::ExecutionResult;
