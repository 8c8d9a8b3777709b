//! Interactive step gate.
//!
//! The gate is a capability: non-interactive builds and hosted runs use
//! [`NoopGate`] and never touch stdin, while the CLI's interactive mode
//! plugs in [`StdinGate`] with its fixed menu.

use async_trait::async_trait;
use flashloop_core_types::ActionPlan;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What the operator decided about a proposed plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Run the plan as proposed.
    Execute,
    /// Skip this plan and replan.
    Skip,
    /// Stop the loop.
    Quit,
    /// Replan with this instruction fed back as guidance.
    Override(String),
}

#[async_trait]
pub trait StepGate: Send + Sync {
    async fn review(&self, plan: &ActionPlan) -> GateDecision;
}

/// Always executes; the non-interactive default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGate;

#[async_trait]
impl StepGate for NoopGate {
    async fn review(&self, _plan: &ActionPlan) -> GateDecision {
        GateDecision::Execute
    }
}

/// Reads `execute | override <text> | skip | quit` from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinGate;

#[async_trait]
impl StepGate for StdinGate {
    async fn review(&self, plan: &ActionPlan) -> GateDecision {
        println!();
        println!("Proposed action: {}", plan.summary());
        if !plan.thought.is_empty() {
            println!("Thought: {}", plan.thought);
        }
        println!("[e]xecute / [o]verride <instruction> / [s]kip / [q]uit");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                // stdin closed: behave as if the operator walked away.
                _ => return GateDecision::Execute,
            };
            match parse_decision(&line) {
                Some(decision) => return decision,
                None => println!("Unrecognized input. [e]xecute / [o]verride <instruction> / [s]kip / [q]uit"),
            }
        }
    }
}

fn parse_decision(line: &str) -> Option<GateDecision> {
    let trimmed = line.trim();
    let lower = trimmed.to_lowercase();
    match lower.as_str() {
        "" | "e" | "execute" => Some(GateDecision::Execute),
        "s" | "skip" => Some(GateDecision::Skip),
        "q" | "quit" => Some(GateDecision::Quit),
        _ => {
            for prefix in ["override ", "o "] {
                if lower.starts_with(prefix) {
                    return Some(GateDecision::Override(trimmed[prefix.len()..].trim().to_string()));
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashloop_core_types::ActionType;

    #[test]
    fn test_parse_decisions() {
        assert_eq!(parse_decision("e"), Some(GateDecision::Execute));
        assert_eq!(parse_decision(""), Some(GateDecision::Execute));
        assert_eq!(parse_decision("skip"), Some(GateDecision::Skip));
        assert_eq!(parse_decision("Q"), Some(GateDecision::Quit));
        assert_eq!(
            parse_decision("override click the second result"),
            Some(GateDecision::Override("click the second result".to_string()))
        );
        assert_eq!(parse_decision("dance"), None);
    }

    #[tokio::test]
    async fn test_noop_gate_executes() {
        let gate = NoopGate;
        let plan = ActionPlan::action(ActionType::Reload);
        assert_eq!(gate.review(&plan).await, GateDecision::Execute);
    }
}
