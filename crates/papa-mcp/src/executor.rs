//! Tool execution engine.
//!
//! `get_agent_output` is a pure echo. `get_event_data` runs the pipeline
//! generator → guard → gateway, and any failure along it is reported as an
//! error-flagged tool result rather than a protocol error.

use crate::error::McpError;
use crate::protocol::CallToolResponse;
use crate::tools::{GET_AGENT_OUTPUT, GET_EVENT_DATA};
use chrono::{Local, NaiveTime};
use papa_db::{DatabaseError, QueryExecutor, RowMap};
use papa_llm::{LlmError, SqlGenerator};
use papa_sql::{GuardError, SqlGuard};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// A failure inside `get_event_data`. Displays as the underlying error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Generation(#[from] LlmError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("failed to serialize rows: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Runs tool calls against the generator, guard and gateway.
#[derive(Clone)]
pub struct ToolExecutor {
    generator: Arc<dyn SqlGenerator>,
    gateway: Arc<dyn QueryExecutor>,
    guard: SqlGuard,
}

impl ToolExecutor {
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        gateway: Arc<dyn QueryExecutor>,
        guard: SqlGuard,
    ) -> Self {
        Self {
            generator,
            gateway,
            guard,
        }
    }

    /// Dispatch a tool call by name.
    ///
    /// Unknown names are a protocol error; everything else yields a result.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<CallToolResponse, McpError> {
        let user_message = user_message(arguments);
        match name {
            GET_AGENT_OUTPUT => Ok(self.agent_output(user_message)),
            GET_EVENT_DATA => Ok(self.event_data(user_message).await),
            _ => Err(McpError::ToolNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Echo `user_message` with the current local time.
    pub fn agent_output(&self, user_message: &str) -> CallToolResponse {
        CallToolResponse::text(agent_output_text(Local::now().time(), user_message))
    }

    /// Answer a question with rows from the event database.
    pub async fn event_data(&self, user_message: &str) -> CallToolResponse {
        match self.query_events(user_message).await {
            Ok(rows) => match serde_json::to_string_pretty(&rows) {
                Ok(text) => CallToolResponse::text(text),
                Err(e) => CallToolResponse::error(ToolError::from(e).to_string()),
            },
            Err(e) => {
                tracing::warn!(error = %e, "get_event_data failed");
                CallToolResponse::error(e.to_string())
            }
        }
    }

    /// Generate, check and run SQL for `user_message`.
    pub async fn query_events(&self, user_message: &str) -> Result<Vec<RowMap>, ToolError> {
        tracing::info!(user_message, "Generating SQL");
        let sql = self.generator.generate(user_message).await?;
        tracing::info!(sql = %sql, "Generated SQL");

        let checked = self.guard.check(&sql).inspect_err(|e| {
            tracing::warn!(sql = %sql, reason = %e, "Generated SQL rejected");
        })?;

        let rows = self.gateway.execute_query(&checked.sql).await?;
        tracing::info!(
            rows = rows.len(),
            tables = ?checked.tables,
            "Query executed"
        );
        Ok(rows)
    }
}

/// A missing or non-string `user_message` reads as empty.
fn user_message(arguments: &Value) -> &str {
    arguments
        .get("user_message")
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn agent_output_text(now: NaiveTime, user_message: &str) -> String {
    format!(
        "The current time is {}. You said: {}.",
        now.format("%H:%M:%S"),
        user_message
    )
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory collaborators for executor and server tests.

    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a fixed answer, or fails with an API error.
    pub struct FixedGenerator(pub Result<String, (u16, String)>);

    #[async_trait]
    impl SqlGenerator for FixedGenerator {
        async fn generate(&self, _user_message: &str) -> Result<String, LlmError> {
            self.0
                .clone()
                .map_err(|(status, body)| LlmError::Api { status, body })
        }
    }

    /// Records executed SQL and returns canned rows.
    #[derive(Default)]
    pub struct RecordingGateway {
        pub executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueryExecutor for RecordingGateway {
        async fn execute_query(&self, sql: &str) -> Result<Vec<RowMap>, DatabaseError> {
            self.executed.lock().unwrap().push(sql.to_string());
            let row = json!({"id": 1, "name": "Launch party"});
            Ok(vec![row.as_object().unwrap().clone()])
        }
    }

    pub fn executor(
        answer: Result<&str, (u16, &str)>,
    ) -> (ToolExecutor, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::default());
        let generator = FixedGenerator(
            answer
                .map(str::to_string)
                .map_err(|(s, b)| (s, b.to_string())),
        );
        let executor = ToolExecutor::new(Arc::new(generator), gateway.clone(), SqlGuard::default());
        (executor, gateway)
    }
}
