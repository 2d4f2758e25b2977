//! Error types for SQL generation.

use thiserror::Error;

/// Errors raised while turning a question into SQL.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The question was blank.
    #[error("user_message must not be empty")]
    EmptyMessage,

    /// The HTTP client could not be built.
    #[error("failed to build LLM client: {0}")]
    Client(#[source] reqwest::Error),

    /// No answer within the configured time.
    #[error("LLM request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Transport-level failure.
    #[error("LLM request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("LLM service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The body was not a chat completion.
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The model answered without any SQL.
    #[error("LLM returned no SQL")]
    EmptyResponse,
}
