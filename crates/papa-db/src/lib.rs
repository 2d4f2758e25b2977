//! # papa-db
//!
//! Database gateway for the Papa MCP server. Executes a complete SQL string on
//! a pooled Postgres connection and returns every row as a JSON object.
//!
//! There is no parameterization, transaction management or retry here. SQL is
//! expected to have passed `papa-sql`'s guard before it arrives.

pub mod decode;
pub mod error;
pub mod gateway;

pub use decode::{RowMap, row_to_json};
pub use error::DatabaseError;
pub use gateway::{PgGateway, QueryExecutor};

// Re-export sqlx types for convenience
pub use sqlx::PgPool;
