//! `papa serve` - run the MCP server.

use anyhow::{Context, Result};
use papa_core::{GuardMode, PapaConfig};
use papa_db::PgGateway;
use papa_llm::OpenAiSqlGenerator;
use papa_mcp::{HttpServer, McpServer, ToolExecutor};
use papa_sql::SqlGuard;
use std::sync::Arc;

pub async fn run(config: PapaConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let auth = if config.server.require_auth {
        // validate() has already confirmed a token resolves.
        config.server.auth_token()
    } else {
        None
    };
    if auth.is_none() {
        tracing::warn!("Bearer authentication is disabled; /sse and /message are open");
    }

    if config.guard.mode == GuardMode::Permissive {
        tracing::warn!("SQL guard is permissive; generated SQL may modify the database");
    }

    let read_only = config.guard.mode == GuardMode::ReadOnly;
    let gateway = PgGateway::connect_lazy(&config.database, read_only)
        .context("Failed to configure the database pool")?;

    if config.llm.api_key().is_none() {
        tracing::warn!(
            env = %config.llm.api_key_env,
            "No LLM API key found; requests are sent without Authorization"
        );
    }
    let generator =
        OpenAiSqlGenerator::new(&config.llm).context("Failed to configure the LLM client")?;
    tracing::info!(
        endpoint = generator.endpoint(),
        model = %config.llm.model,
        "Configured SQL generator"
    );

    let executor = ToolExecutor::new(
        Arc::new(generator),
        Arc::new(gateway.clone()),
        SqlGuard::new(&config.guard),
    );
    let server = Arc::new(McpServer::new(executor));

    let result = HttpServer::new(&config.server, server, auth).run().await;
    gateway.close().await;
    tracing::info!("Server stopped");
    result.context("MCP server failed")
}
