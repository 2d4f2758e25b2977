//! SQL parsing and analysis.

use crate::error::GuardError;
use sqlparser::ast::{
    Expr, ObjectName, Query, SetExpr, Statement, visit_expressions, visit_relations,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::ops::ControlFlow;

/// Functions that change server or session state, or reach outside the
/// database, even when called from a plain SELECT.
const DENIED_FUNCTIONS: &[&str] = &[
    "pg_terminate_backend",
    "pg_cancel_backend",
    "pg_reload_conf",
    "pg_rotate_logfile",
    "pg_switch_wal",
    "pg_create_restore_point",
    "pg_notify",
    "pg_read_file",
    "pg_read_binary_file",
    "pg_ls_dir",
    "set_config",
    "setval",
    "nextval",
];

/// Function families denied by name prefix.
const DENIED_FUNCTION_PREFIXES: &[&str] = &["lo_", "dblink", "pg_advisory"];

/// Analyzes SQL statements to classify them and extract table references.
pub struct SqlAnalyzer {
    dialect: PostgreSqlDialect,
}

impl Clone for SqlAnalyzer {
    fn clone(&self) -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }
}

impl Default for SqlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlAnalyzer {
    /// Create a new SQL analyzer.
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, GuardError> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| GuardError::ParseError(e.to_string()))
    }

    /// Extract every table a statement references, including ones inside
    /// subqueries and CTEs. Names are unqualified and lowercased, in first-seen
    /// order without duplicates.
    pub fn extract_tables(&self, stmt: &Statement) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        let _ = visit_relations(stmt, |relation: &ObjectName| {
            let name = unqualified_name(relation);
            if !tables.contains(&name) {
                tables.push(name);
            }
            ControlFlow::<()>::Continue(())
        });
        tables
    }

    /// Check if a statement is a DDL statement.
    pub fn is_ddl(&self, stmt: &Statement) -> bool {
        matches!(
            stmt,
            Statement::CreateTable { .. }
                | Statement::AlterTable { .. }
                | Statement::Drop { .. }
                | Statement::Truncate { .. }
                | Statement::CreateIndex { .. }
                | Statement::CreateView { .. }
        )
    }

    /// Get the type of SQL operation.
    pub fn get_operation(&self, stmt: &Statement) -> SqlOperation {
        match stmt {
            Statement::Query(_) => SqlOperation::Select,
            Statement::Insert { .. } => SqlOperation::Insert,
            Statement::Update { .. } => SqlOperation::Update,
            Statement::Delete { .. } => SqlOperation::Delete,
            _ if self.is_ddl(stmt) => SqlOperation::Ddl,
            _ => SqlOperation::Other,
        }
    }

    /// Find the first reason a query is not side-effect free, if any.
    ///
    /// Covers data-modifying CTEs, `SELECT ... INTO` and row locking clauses.
    /// Function calls are checked separately by [`Self::denied_function`].
    pub fn read_only_violation(&self, query: &Query) -> Option<String> {
        if !query.locks.is_empty() {
            return Some("row locking clause".to_string());
        }
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                if let Some(reason) = self.read_only_violation(&cte.query) {
                    return Some(format!("CTE {}: {}", cte.alias.name.value, reason));
                }
            }
        }
        self.set_expr_violation(&query.body)
    }

    /// The first administrative or side-effecting function the statement
    /// calls, if any. Set-returning calls in FROM are checked too.
    pub fn denied_function(&self, stmt: &Statement) -> Option<String> {
        let called = visit_expressions(stmt, |expr: &Expr| match expr {
            Expr::Function(func) => {
                let name = unqualified_name(&func.name);
                if is_denied_function(&name) {
                    ControlFlow::Break(name)
                } else {
                    ControlFlow::Continue(())
                }
            }
            _ => ControlFlow::Continue(()),
        });
        match called {
            ControlFlow::Break(name) => Some(name),
            ControlFlow::Continue(()) => self
                .extract_tables(stmt)
                .into_iter()
                .find(|name| is_denied_function(name)),
        }
    }

    fn set_expr_violation(&self, body: &SetExpr) -> Option<String> {
        match body {
            SetExpr::Select(select) => select
                .into
                .as_ref()
                .map(|_| "SELECT ... INTO creates a table".to_string()),
            SetExpr::Query(query) => self.read_only_violation(query),
            SetExpr::SetOperation { left, right, .. } => self
                .set_expr_violation(left)
                .or_else(|| self.set_expr_violation(right)),
            SetExpr::Values(_) | SetExpr::Table(_) => None,
            other => Some(format!("data-modifying expression `{}`", other)),
        }
    }
}

fn is_denied_function(name: &str) -> bool {
    DENIED_FUNCTIONS.contains(&name)
        || DENIED_FUNCTION_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

/// Last component of a possibly schema-qualified name, unquoted and lowercased.
fn unqualified_name(name: &ObjectName) -> String {
    let full = name.to_string();
    let last = full.rsplit('.').next().unwrap_or(&full);
    last.trim_matches('"').to_lowercase()
}

/// Types of SQL operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Other,
}

impl SqlOperation {
    /// Upper-case keyword used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlOperation::Select => "SELECT",
            SqlOperation::Insert => "INSERT",
            SqlOperation::Update => "UPDATE",
            SqlOperation::Delete => "DELETE",
            SqlOperation::Ddl => "DDL",
            SqlOperation::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for SqlOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
