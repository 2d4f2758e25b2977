//! CLI command implementations for the Papa MCP server.

pub mod check_sql;
pub mod config;
pub mod serve;
pub mod tools;
