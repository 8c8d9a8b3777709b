//! Plan execution: validate, resolve, act, settle, emit.

pub mod dispatch;
pub mod primitives;

pub use dispatch::{is_fatal_message, Executor};
