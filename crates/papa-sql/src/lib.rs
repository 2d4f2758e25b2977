//! # papa-sql
//!
//! Guards the boundary between the SQL generator and the database. Language
//! model output is parsed with `sqlparser` and checked against a [`GuardMode`]
//! before anything is executed:
//!
//! - **ReadOnly** (default): exactly one side-effect-free query
//! - **Permissive**: anything that parses, up to `max_statements`
//!
//! Blocked tables are rejected in both modes.

pub mod analyzer;
pub mod error;
pub mod guard;

pub use analyzer::{SqlAnalyzer, SqlOperation};
pub use error::GuardError;
pub use guard::{CheckedSql, SqlGuard};
pub use papa_core::GuardMode;
