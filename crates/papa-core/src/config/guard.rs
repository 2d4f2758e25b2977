//! Guard configuration for generated SQL.

use serde::{Deserialize, Serialize};

/// How strictly generated SQL is checked before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// Only a single side-effect-free query is allowed.
    #[default]
    ReadOnly,
    /// Anything that parses is allowed.
    Permissive,
}

/// Configuration for the SQL guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub mode: GuardMode,

    /// Maximum number of statements in one generated string.
    #[serde(default = "default_max_statements")]
    pub max_statements: usize,

    /// Tables generated SQL may never reference.
    #[serde(default)]
    pub blocked_tables: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            mode: GuardMode::default(),
            max_statements: default_max_statements(),
            blocked_tables: Vec::new(),
        }
    }
}

fn default_max_statements() -> usize {
    1
}
