//! SQL generation through a chat completions endpoint.

use crate::error::LlmError;
use crate::prompt::{extract_sql, system_prompt};
use async_trait::async_trait;
use papa_core::LlmConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turns a natural-language question into SQL text.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, user_message: &str) -> Result<String, LlmError>;
}

/// [`SqlGenerator`] backed by any OpenAI-compatible `/chat/completions` API.
#[derive(Debug, Clone)]
pub struct OpenAiSqlGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    system_prompt: String,
    timeout_seconds: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiSqlGenerator {
    /// Build a generator from configuration, resolving the API key from the
    /// environment.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::with_api_key(config, config.api_key())
    }

    /// Build a generator with an already resolved API key.
    pub fn with_api_key(config: &LlmConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(LlmError::Client)?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            system_prompt: system_prompt(config),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            LlmError::Request(err)
        }
    }
}

#[async_trait]
impl SqlGenerator for OpenAiSqlGenerator {
    async fn generate(&self, user_message: &str) -> Result<String, LlmError> {
        let question = user_message.trim();
        if question.is_empty() {
            return Err(LlmError::EmptyMessage);
        }

        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, "Requesting SQL from LLM");
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "LLM request rejected");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        let sql = extract_sql(&content).ok_or(LlmError::EmptyResponse)?;
        tracing::debug!(sql = %sql, "LLM produced SQL");
        Ok(sql)
    }
}
