//! Validation of generated SQL before execution.

use crate::analyzer::{SqlAnalyzer, SqlOperation};
use crate::error::GuardError;
use papa_core::{GuardConfig, GuardMode};
use sqlparser::ast::Statement;

/// SQL that passed the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedSql {
    /// The text to execute, unchanged.
    pub sql: String,
    /// Operation of each statement, in order.
    pub operations: Vec<SqlOperation>,
    /// Tables referenced anywhere in the SQL.
    pub tables: Vec<String>,
}

/// Checks generated SQL against the configured policy.
#[derive(Clone)]
pub struct SqlGuard {
    analyzer: SqlAnalyzer,
    mode: GuardMode,
    max_statements: usize,
    blocked_tables: Vec<String>,
}

impl Default for SqlGuard {
    fn default() -> Self {
        Self::new(&GuardConfig::default())
    }
}

impl SqlGuard {
    /// Create a guard from configuration.
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            analyzer: SqlAnalyzer::new(),
            mode: config.mode,
            max_statements: config.max_statements.max(1),
            blocked_tables: config
                .blocked_tables
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    /// The configured mode.
    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    /// Validate `sql`, returning what it touches on success.
    pub fn check(&self, sql: &str) -> Result<CheckedSql, GuardError> {
        if sql.trim().is_empty() {
            return Err(GuardError::Empty);
        }

        let statements = self.analyzer.parse(sql)?;
        if statements.is_empty() {
            return Err(GuardError::Empty);
        }
        if statements.len() > self.max_statements {
            return Err(GuardError::TooManyStatements {
                max: self.max_statements,
                found: statements.len(),
            });
        }

        let mut operations = Vec::with_capacity(statements.len());
        let mut tables: Vec<String> = Vec::new();
        for stmt in &statements {
            let operation = self.analyzer.get_operation(stmt);
            if self.mode == GuardMode::ReadOnly {
                self.check_read_only(stmt, operation)?;
            }
            for table in self.analyzer.extract_tables(stmt) {
                if self.blocked_tables.contains(&table) {
                    return Err(GuardError::TableAccessDenied { table });
                }
                if !tables.contains(&table) {
                    tables.push(table);
                }
            }
            operations.push(operation);
        }

        tracing::debug!(
            mode = ?self.mode,
            operations = ?operations,
            tables = ?tables,
            "Generated SQL passed guard"
        );

        Ok(CheckedSql {
            sql: sql.to_string(),
            operations,
            tables,
        })
    }

    fn check_read_only(&self, stmt: &Statement, operation: SqlOperation) -> Result<(), GuardError> {
        match stmt {
            Statement::Query(query) => {
                if let Some(reason) = self.analyzer.read_only_violation(query) {
                    return Err(GuardError::NotReadOnly { reason });
                }
                match self.analyzer.denied_function(stmt) {
                    Some(function) => Err(GuardError::FunctionNotAllowed { function }),
                    None => Ok(()),
                }
            }
            _ if operation == SqlOperation::Ddl => Err(GuardError::DdlNotAllowed {
                statement: first_words(&stmt.to_string()),
            }),
            _ => Err(GuardError::StatementNotAllowed {
                operation: operation.to_string(),
            }),
        }
    }
}

/// First two words of a statement, for error messages.
fn first_words(sql: &str) -> String {
    sql.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}
