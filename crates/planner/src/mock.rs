//! Deterministic planner for tests and offline development.

use std::sync::Mutex;

use async_trait::async_trait;
use flashloop_core_types::{ActionPlan, ActionType};

use crate::{PlanRequest, Planner, PlannerError};

/// Replays a fixed sequence of plans, then keeps answering `finish`.
/// Requests are recorded so tests can assert what the planner saw.
#[derive(Default)]
pub struct ScriptedPlanner {
    plans: Mutex<Vec<ActionPlan>>,
    seen: Mutex<Vec<PlanRequest>>,
}

impl ScriptedPlanner {
    pub fn new(mut plans: Vec<ActionPlan>) -> Self {
        // Stored reversed so pop() yields them in order.
        plans.reverse();
        Self {
            plans: Mutex::new(plans),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// The requests this planner has been asked to answer.
    pub fn requests(&self) -> Vec<PlanRequest> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<ActionPlan, PlannerError> {
        self.seen.lock().expect("seen lock").push(request.clone());
        let next = self.plans.lock().expect("plans lock").pop();
        Ok(next.unwrap_or_else(|| {
            let mut plan = ActionPlan::action(ActionType::Finish);
            plan.thought = "scripted sequence exhausted".to_string();
            plan
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_finishes() {
        let planner = ScriptedPlanner::new(vec![
            ActionPlan::action(ActionType::Click).with_target("button-1a2b3c4d-0"),
            ActionPlan::action(ActionType::Fill)
                .with_target("input-9f8e7d6c-0")
                .with_value("hello"),
        ]);
        let request = PlanRequest {
            goal: "g".into(),
            state_text: "s".into(),
            history: Vec::new(),
            last_error: None,
        };

        let first = planner.plan(&request).await.unwrap();
        assert_eq!(first.action_type, ActionType::Click);
        let second = planner.plan(&request).await.unwrap();
        assert_eq!(second.action_type, ActionType::Fill);
        let third = planner.plan(&request).await.unwrap();
        assert!(third.is_finished);
        assert_eq!(planner.requests().len(), 3);
    }
}
