//! HTTP server configuration.
//!
//! This module defines the listener, authentication and session settings for
//! the SSE front door.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP/SSE server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port. The `PORT` environment variable overrides this.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether `/sse` and `/message` require a bearer token.
    #[serde(default)]
    pub require_auth: bool,

    /// Bearer token accepted when `require_auth` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Environment variable containing the bearer token.
    /// Takes precedence over `auth_token`.
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,

    /// Maximum number of concurrently open sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Interval between SSE keep-alive comments.
    #[serde(default = "default_keep_alive_seconds")]
    pub keep_alive_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            require_auth: false,
            auth_token: None,
            auth_token_env: default_auth_token_env(),
            max_sessions: default_max_sessions(),
            keep_alive_seconds: default_keep_alive_seconds(),
        }
    }
}

/// A resolved bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Compare against a presented token.
    pub fn matches(&self, presented: &str) -> bool {
        self.0 == presented
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the bearer token, checking the environment first.
    ///
    /// Empty values are treated as absent.
    pub fn auth_token_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<AuthToken> {
        lookup(&self.auth_token_env)
            .filter(|t| !t.is_empty())
            .or_else(|| self.auth_token.clone())
            .filter(|t| !t.is_empty())
            .map(AuthToken)
    }

    /// Resolve the bearer token from the process environment.
    pub fn auth_token(&self) -> Option<AuthToken> {
        self.auth_token_with(|name| std::env::var(name).ok())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_auth_token_env() -> String {
    "AUTH_TOKEN".to_string()
}

fn default_max_sessions() -> usize {
    1000
}

fn default_keep_alive_seconds() -> u64 {
    15
}
