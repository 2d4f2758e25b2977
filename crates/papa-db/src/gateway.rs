//! Connection-pooled query execution.

use crate::decode::{RowMap, row_to_json};
use crate::error::DatabaseError;
use async_trait::async_trait;
use papa_core::{DatabaseConfig, SslMode};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;

/// Something that can run a SQL string and return its rows.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute `sql` and return the full row set, or nothing.
    async fn execute_query(&self, sql: &str) -> Result<Vec<RowMap>, DatabaseError>;
}

/// Postgres implementation of [`QueryExecutor`].
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgGateway {
    /// Build a lazily connecting pool from configuration.
    ///
    /// No connection is attempted until the first query, so the server can
    /// start while the database is unavailable. With `read_only` every session
    /// defaults to read-only transactions, so Postgres itself refuses writes
    /// that slip past SQL inspection (`setval`, `lo_*`, ...).
    pub fn connect_lazy(config: &DatabaseConfig, read_only: bool) -> Result<Self, DatabaseError> {
        let options = connect_options(config, read_only)?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(Duration::from_secs(config.pool.acquire_timeout_seconds))
            .idle_timeout(Some(Duration::from_secs(config.pool.idle_timeout_seconds)))
            .connect_lazy_with(options);

        tracing::info!(
            database = %config.redacted_connection_string(),
            max_connections = config.pool.max_connections,
            read_only,
            "Configured Postgres pool"
        );

        Ok(Self::from_pool(
            pool,
            Duration::from_secs(config.statement_timeout_seconds),
        ))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `SELECT 1` to confirm the database is reachable.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.execute_query("SELECT 1").await.map(|_| ())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QueryExecutor for PgGateway {
    async fn execute_query(&self, sql: &str) -> Result<Vec<RowMap>, DatabaseError> {
        // The pooled connection is released on every path, including timeout.
        let outcome =
            tokio::time::timeout(self.statement_timeout, sqlx::raw_sql(sql).fetch_all(&self.pool))
                .await;

        match outcome {
            Ok(Ok(rows)) => {
                tracing::debug!(rows = rows.len(), "Query executed");
                Ok(rows.iter().map(row_to_json).collect())
            }
            Ok(Err(e)) if is_acquire_error(&e) => {
                tracing::error!(error = %e, "Failed to acquire database connection");
                Err(DatabaseError::Acquire(e))
            }
            Ok(Err(e)) => {
                tracing::error!(sql = %sql, error = %e, "Database error executing query");
                Err(DatabaseError::Query(e))
            }
            Err(_) => {
                let seconds = self.statement_timeout.as_secs();
                tracing::error!(sql = %sql, seconds, "Query timed out");
                Err(DatabaseError::Timeout { seconds })
            }
        }
    }
}

/// Connection options for `config`.
///
/// `statement_timeout` is also set server-side so a statement abandoned by the
/// client timeout is cancelled in Postgres too.
fn connect_options(
    config: &DatabaseConfig,
    read_only: bool,
) -> Result<PgConnectOptions, DatabaseError> {
    let url = config.connection_string();
    let mut options =
        PgConnectOptions::from_str(&url).map_err(|e| DatabaseError::Config(e.to_string()))?;
    if let Some(mode) = config.ssl_mode {
        options = options.ssl_mode(pg_ssl_mode(mode));
    }

    let timeout_ms = config.statement_timeout_seconds.saturating_mul(1000);
    let mut settings = vec![("statement_timeout", timeout_ms.to_string())];
    if read_only {
        settings.push(("default_transaction_read_only", "on".to_string()));
    }
    Ok(options.options(settings))
}

/// Errors raised before the statement reached a connection.
fn is_acquire_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
    )
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(url: &str) -> DatabaseConfig {
        let mut config = DatabaseConfig {
            database_url_env: None,
            database_url: Some(url.to_string()),
            ..Default::default()
        };
        config.pool.acquire_timeout_seconds = 1;
        config
    }

    #[tokio::test]
    async fn test_gateway_is_a_shareable_executor() {
        fn assert_executor<T: QueryExecutor + Send + Sync + 'static>() {}
        assert_executor::<PgGateway>();

        fn assert_send<T: Send>(_: &T) {}
        let pool = PgPool::connect_lazy("postgresql://u@h/db").unwrap();
        let gateway = PgGateway::from_pool(pool, Duration::from_secs(1));
        let future = gateway.execute_query("SELECT 1");
        assert_send(&future);
    }

    #[test]
    fn test_read_only_sessions() {
        let options = connect_options(&config_for("postgresql://u@h:5432/db"), true).unwrap();
        let settings = options.get_options().unwrap_or_default();
        assert!(settings.contains("statement_timeout=30000"));
        assert!(settings.contains("default_transaction_read_only=on"));

        let options = connect_options(&config_for("postgresql://u@h:5432/db"), false).unwrap();
        assert!(
            !options
                .get_options()
                .unwrap_or_default()
                .contains("default_transaction_read_only")
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let err = PgGateway::connect_lazy(&config_for("not a url"), true)
            .err()
            .unwrap();
        assert!(matches!(err, DatabaseError::Config(_)));
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[tokio::test]
    async fn test_unreachable_database_fails_to_acquire() {
        let gateway =
            PgGateway::connect_lazy(&config_for("postgresql://nobody@127.0.0.1:1/none"), true)
                .unwrap();
        let err = gateway.execute_query("SELECT 1").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Acquire(_)));
        assert!(err.to_string().starts_with("Database error:"));
    }
}
