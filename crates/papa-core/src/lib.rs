//! Shared configuration for the Papa MCP server.
//!
//! Every other crate in the workspace takes its settings from the types
//! re-exported here, so a single `papa.yaml` drives the whole process.

pub mod config;

pub use config::{
    AuthToken, ConfigError, ConnectionPoolConfig, DatabaseConfig, GuardConfig, GuardMode,
    LlmConfig, LogFormat, LoggingConfig, PapaConfig, ServerConfig, SslMode,
};
