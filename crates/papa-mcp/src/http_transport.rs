//! HTTP transport for MCP server.
//!
//! MCP over HTTP+SSE: a client opens `GET /sse`, receives an `endpoint` event
//! naming its message URL, then POSTs JSON-RPC messages there. Responses come
//! back on the stream as `message` events.

use crate::error::McpError;
use crate::server::McpServer;
use crate::session::{SessionError, SessionGuard, SessionHandle, SessionRegistry};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use papa_core::{AuthToken, ServerConfig};
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

const INFO_TEXT: &str = "MCP Server is running with SSE. Connect via GET /sse";

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
    pub sessions: Arc<SessionRegistry>,
    pub auth: Option<AuthToken>,
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(server: Arc<McpServer>, config: &ServerConfig, auth: Option<AuthToken>) -> Self {
        Self {
            server,
            sessions: Arc::new(SessionRegistry::new(config.max_sessions)),
            auth,
            keep_alive: Duration::from_secs(config.keep_alive_seconds.max(1)),
        }
    }
}

/// Query parameters for the message endpoint.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Create the HTTP router for MCP.
pub fn create_router(state: AppState) -> Router {
    let mut mcp = Router::new()
        .route("/sse", get(handle_sse).fallback(handle_info))
        .route("/message", post(handle_message).fallback(handle_info));
    if let Some(token) = state.auth.clone() {
        mcp = mcp.route_layer(middleware::from_fn_with_state(token, require_bearer));
    }

    Router::new()
        .merge(mcp)
        .route("/health", get(handle_health))
        .fallback(handle_info)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open a session and stream its responses.
async fn handle_sse(State(state): State<AppState>) -> Response {
    let (handle, mut outbound) = SessionHandle::spawn(state.server.clone());
    let session_id = handle.id().to_string();
    if let Err(e) = state.sessions.insert(handle) {
        tracing::warn!(error = %e, "Rejecting SSE connection");
        return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
    }
    tracing::info!(session_id = %session_id, "SSE session opened");

    let guard = SessionGuard::new(session_id.clone(), state.sessions.clone());
    let endpoint = format!("/message?sessionId={}", session_id);
    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));
        while let Some(response) = outbound.recv().await {
            match serde_json::to_string(&response) {
                Ok(data) => yield Ok(Event::default().event("message").data(data)),
                Err(e) => tracing::error!(error = %e, "Failed to encode response"),
            }
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.keep_alive))
        .into_response()
}

/// Accept a JSON-RPC message for an open session.
async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(handle) = query
        .session_id
        .as_deref()
        .and_then(|id| state.sessions.get(id))
    else {
        tracing::debug!(session_id = ?query.session_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", e)).into_response();
        }
    };

    match handle.try_send(message) {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(e @ SessionError::Busy { .. }) => {
            tracing::warn!(error = %e, "Rejecting message for busy session");
            (StatusCode::SERVICE_UNAVAILABLE, "Session busy").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to enqueue message");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Handle health check requests.
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "papa-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.len()
    }))
}

async fn handle_info() -> &'static str {
    INFO_TEXT
}

async fn require_bearer(State(token): State<AuthToken>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(presented) if token.matches(presented) => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated request");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

/// HTTP server for MCP transport.
pub struct HttpServer {
    bind_addr: String,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(config: &ServerConfig, server: Arc<McpServer>, auth: Option<AuthToken>) -> Self {
        Self {
            bind_addr: config.bind_addr(),
            state: AppState::new(server, config, auth),
        }
    }

    /// The session registry shared with the handlers.
    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.state.sessions.clone()
    }

    /// Run until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), McpError> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `signal` completes, then close every session and drain.
    pub async fn run_until(
        self,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), McpError> {
        let listener = tokio::net::TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| {
                McpError::StartupFailed(format!("Failed to bind to {}: {}", self.bind_addr, e))
            })?;

        self.serve(listener, signal).await
    }

    /// Serve on an already bound listener until `signal` completes.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), McpError> {
        let addr = listener
            .local_addr()
            .map_or_else(|_| self.bind_addr.clone(), |a| a.to_string());
        tracing::info!(addr = %addr, "MCP SSE server listening");

        let sessions = self.state.sessions.clone();
        let app = create_router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                let closed = sessions.close_all();
                tracing::info!(closed, "Shutting down, closed open sessions");
            })
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
