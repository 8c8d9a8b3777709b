//! OpenAI-compatible chat-completions provider (Cerebras by default).

use std::time::Duration;

use async_trait::async_trait;
use flashloop_core_types::ActionPlan;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::prompt::{system_prompt, user_message};
use crate::{PlanRequest, Planner, PlannerError};

pub const DEFAULT_API_BASE: &str = "https://api.cerebras.ai/v1";
pub const DEFAULT_MODEL: &str = "llama3.1-70b";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Stateless planner over an OpenAI-compatible `/chat/completions` endpoint,
/// temperature 0, JSON-object response format.
pub struct CerebrasPlanner {
    client: reqwest::Client,
    config: ProviderConfig,
    system_prompt: String,
}

impl CerebrasPlanner {
    pub fn new(config: ProviderConfig) -> Result<Self, PlannerError> {
        if config.api_key.trim().is_empty() {
            return Err(PlannerError::Config("API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| PlannerError::Config(err.to_string()))?;
        Ok(Self {
            client,
            config,
            system_prompt: system_prompt(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Planner for CerebrasPlanner {
    async fn plan(&self, request: &PlanRequest) -> Result<ActionPlan, PlannerError> {
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": user_message(request) },
            ],
        });

        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| PlannerError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "planner request rejected");
            return Err(PlannerError::Transport(format!(
                "{status}: {}",
                detail.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| PlannerError::Transport(err.to_string()))?;
        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default();
        debug!(chars = content.len(), "planner responded");

        decode_plan(content)
    }
}

/// Decode the model output, tolerating markdown code fences around the JSON.
pub fn decode_plan(content: &str) -> Result<ActionPlan, PlannerError> {
    let trimmed = strip_fences(content);
    if trimmed.is_empty() {
        return Err(PlannerError::Parse("empty response".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|err| PlannerError::Parse(err.to_string()))
}

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashloop_core_types::ActionType;

    #[test]
    fn test_decode_plain_json() {
        let plan = decode_plan(
            r#"{"thought": "click it", "actionType": "click", "targetId": "button-1a2b3c4d-0"}"#,
        )
        .unwrap();
        assert_eq!(plan.action_type, ActionType::Click);
    }

    #[test]
    fn test_decode_fenced_json() {
        let plan = decode_plan(
            "```json\n{\"actionType\": \"finish\", \"isFinished\": true}\n```",
        )
        .unwrap();
        assert!(plan.is_finished);
    }

    #[test]
    fn test_decode_garbage_gives_schema_guidance() {
        let err = decode_plan("I think you should click the button").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("matching the schema"));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_plan("").is_err());
        assert!(decode_plan("```\n```").is_err());
    }

    #[test]
    fn test_config_rejects_empty_key() {
        assert!(CerebrasPlanner::new(ProviderConfig::new("")).is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::new("key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.api_base.contains("cerebras"));
    }
}
