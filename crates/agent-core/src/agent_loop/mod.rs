//! Loop orchestration for the observe-think-act cycle.

mod config;
mod controller;

pub use config::LoopConfig;
pub use controller::{Agent, AgentLoop, LoopResult, LoopStatus};
