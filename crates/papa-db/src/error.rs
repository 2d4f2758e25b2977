//! Error types for the database gateway.

use thiserror::Error;

/// Errors surfaced by [`QueryExecutor::execute_query`](crate::QueryExecutor::execute_query).
///
/// Every variant renders with a `Database error:` prefix; callers hand the
/// message straight to the client.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The connection URL or options were rejected.
    #[error("Database error: invalid configuration: {0}")]
    Config(String),

    /// No connection could be taken from the pool.
    #[error("Database error: {0}")]
    Acquire(#[source] sqlx::Error),

    /// The statement failed.
    #[error("Database error: {0}")]
    Query(#[source] sqlx::Error),

    /// The statement exceeded the configured timeout.
    #[error("Database error: query timed out after {seconds}s")]
    Timeout { seconds: u64 },
}
