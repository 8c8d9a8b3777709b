//! Environment configuration for the CLI and the in-process entry point.

use anyhow::{bail, Result};

pub const API_KEY_VAR: &str = "CEREBRAS_API_KEY";
pub const MODEL_VAR: &str = "LLM_MODEL_NAME";
pub const DEFAULT_MODEL: &str = "llama3.1-70b";

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub api_key: String,
    pub model: String,
}

impl EnvConfig {
    /// Read the LLM credentials and model choice from the environment.
    pub fn from_env() -> Result<Self> {
        let api_key = match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!(
                "{API_KEY_VAR} is not set; export it or put it in a .env file"
            ),
        };
        let model = std::env::var(MODEL_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self { api_key, model })
    }
}

/// CI guard for the in-process entry point: under `CI=true` the agent is a
/// no-op unless `ALLOW_AI_IN_CI` opts back in.
pub fn ai_disabled_in_ci() -> bool {
    let in_ci = std::env::var("CI")
        .map(|value| value == "true" || value == "1")
        .unwrap_or(false);
    let allowed = std::env::var("ALLOW_AI_IN_CI")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    in_ci && !allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them serialized by testing
    // distinct variables only.
    #[test]
    fn test_default_model_constant() {
        assert_eq!(DEFAULT_MODEL, "llama3.1-70b");
    }

    #[test]
    fn test_missing_key_errors() {
        std::env::remove_var(API_KEY_VAR);
        assert!(EnvConfig::from_env().is_err());
    }
}
