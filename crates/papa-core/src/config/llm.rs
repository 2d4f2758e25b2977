//! Language model configuration for SQL generation.

use serde::{Deserialize, Serialize};

/// Settings for the OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API key given inline. The environment variable wins when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Free-form description of the event database schema, appended to the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_hint: Option<String>,

    /// Replaces the built-in system prompt entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_seconds: default_timeout(),
            schema_hint: None,
            system_prompt: None,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key with an explicit environment lookup.
    ///
    /// Empty values are treated as absent.
    pub fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        lookup(&self.api_key_env)
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Resolve the API key from the process environment.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_file_key(key: &str) -> LlmConfig {
        LlmConfig {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_env_key_wins() {
        let config = with_file_key("from-file");
        let key = config
            .api_key_with(|name| (name == "OPENAI_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_empty_env_key_falls_back_to_file() {
        let config = with_file_key("from-file");
        assert_eq!(
            config.api_key_with(|_| Some(String::new())).as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn test_empty_key_is_absent() {
        assert!(with_file_key("").api_key_with(|_| None).is_none());
    }
}
