//! Configuration types for the Papa MCP server.
//!
//! Configuration is loaded from a YAML file (`papa.yaml` by default), then
//! overlaid with environment variables. The CLI applies its own flags last.
//!
//! # Sections
//!
//! - **server**: listener, bearer auth and session limits
//! - **database**: Postgres connection and pool
//! - **llm**: chat completions endpoint used to turn questions into SQL
//! - **guard**: what generated SQL may do
//! - **logging**: level and output format

pub mod database;
pub mod guard;
pub mod llm;
pub mod logging;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use database::{ConnectionPoolConfig, DatabaseConfig, SslMode};
pub use guard::{GuardConfig, GuardMode};
pub use llm::LlmConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use server::{AuthToken, ServerConfig};

/// Complete configuration loaded from file and environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PapaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PapaConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load the file if it exists, otherwise start from defaults, then apply the
    /// process environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment overrides.
    ///
    /// Only `PORT` is read here; the database URL, auth token and API key are
    /// resolved lazily through their `*_env` settings.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with(|name| std::env::var(name).ok())
    }

    /// Same as [`validate`](Self::validate) with an explicit environment lookup.
    pub fn validate_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Config("server.port must be non-zero".into()));
        }
        if self.server.max_sessions == 0 {
            return Err(ConfigError::Config(
                "server.max_sessions must be at least 1".into(),
            ));
        }
        if self.guard.max_statements == 0 {
            return Err(ConfigError::Config(
                "guard.max_statements must be at least 1".into(),
            ));
        }
        if self.server.require_auth && self.server.auth_token_with(&lookup).is_none() {
            return Err(ConfigError::Config(format!(
                "server.require_auth is set but no token found in server.auth_token or ${}",
                self.server.auth_token_env
            )));
        }
        Ok(())
    }

    /// Copy of this configuration with inline secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let mask = |s: &mut Option<String>| {
            if s.is_some() {
                *s = Some("***".to_string());
            }
        };
        mask(&mut copy.server.auth_token);
        mask(&mut copy.database.password);
        mask(&mut copy.llm.api_key);
        if let Some(url) = &copy.database.database_url {
            copy.database.database_url = Some(database::redact_url(url));
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = PapaConfig::from_yaml("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.guard.mode, GuardMode::ReadOnly);
    }

    #[test]
    fn test_parse_sections() {
        let yaml = r#"
server:
  port: 8080
  require_auth: true
  auth_token: abc
database:
  database_url: postgresql://u@h:5432/events
  statement_timeout_seconds: 5
llm:
  model: local-model
  base_url: http://localhost:11434/v1
guard:
  mode: permissive
  blocked_tables: [users]
logging:
  format: json
"#;
        let config = PapaConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.server.require_auth);
        assert_eq!(config.database.statement_timeout_seconds, 5);
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.guard.mode, GuardMode::Permissive);
        assert_eq!(config.guard.blocked_tables, vec!["users".to_string()]);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate_with(|_| None).is_ok());
    }

    #[test]
    fn test_port_from_env() {
        let mut config = PapaConfig::default();
        config
            .apply_env(|name| (name == "PORT").then(|| "4100".to_string()))
            .unwrap();
        assert_eq!(config.server.port, 4100);
    }

    #[test]
    fn test_bad_port_env() {
        let mut config = PapaConfig::default();
        let err = config
            .apply_env(|name| (name == "PORT").then(|| "nope".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_require_auth_without_token_fails() {
        let mut config = PapaConfig::default();
        config.server.require_auth = true;
        assert!(config.validate_with(|_| None).is_err());
        assert!(
            config
                .validate_with(|name| (name == "AUTH_TOKEN").then(|| "t".to_string()))
                .is_ok()
        );
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = PapaConfig::default();
        config.guard.max_statements = 0;
        assert!(config.validate_with(|_| None).is_err());

        let mut config = PapaConfig::default();
        config.server.max_sessions = 0;
        assert!(config.validate_with(|_| None).is_err());
    }

    #[test]
    fn test_redacted() {
        let mut config = PapaConfig::default();
        config.server.auth_token = Some("secret".into());
        config.llm.api_key = Some("sk-123".into());
        config.database.database_url = Some("postgresql://a:b@h/db".into());

        let redacted = config.redacted();
        assert_eq!(redacted.server.auth_token.as_deref(), Some("***"));
        assert_eq!(redacted.llm.api_key.as_deref(), Some("***"));
        assert_eq!(
            redacted.database.database_url.as_deref(),
            Some("postgresql://a:***@h/db")
        );
    }
}
