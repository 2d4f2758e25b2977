//! Error types for the SQL guard.

use thiserror::Error;

/// Reasons generated SQL is refused before it reaches the database.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// Nothing to run.
    #[error("generated SQL is empty")]
    Empty,

    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    ParseError(String),

    /// More statements than allowed.
    #[error("expected at most {max} statement(s), got {found}")]
    TooManyStatements { max: usize, found: usize },

    /// DDL statement is not allowed.
    #[error("DDL statement not allowed: {statement}")]
    DdlNotAllowed { statement: String },

    /// Statement kind is not allowed in read-only mode.
    #[error("{operation} statements are not allowed in read-only mode")]
    StatementNotAllowed { operation: String },

    /// Query would write, lock or create something.
    #[error("query is not read-only: {reason}")]
    NotReadOnly { reason: String },

    /// Call to an administrative or side-effecting function.
    #[error("function {function} is not allowed in read-only mode")]
    FunctionNotAllowed { function: String },

    /// Table access is not allowed.
    #[error("access to table {table} is not allowed")]
    TableAccessDenied { table: String },
}
