//! # papa-llm
//!
//! Turns a user's question into SQL text by asking a chat completions model.
//! The output is normalized (code fences and trailing semicolons removed) but
//! not validated; that is `papa-sql`'s job.

pub mod error;
pub mod generator;
pub mod prompt;

pub use error::LlmError;
pub use generator::{OpenAiSqlGenerator, SqlGenerator};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, extract_sql, system_prompt};
