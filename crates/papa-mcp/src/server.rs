//! MCP server implementation.
//!
//! Dispatches JSON-RPC messages to protocol handlers and tools. The server is
//! transport-agnostic: it takes one decoded message and returns at most one
//! response (notifications get none).

use crate::error::McpError;
use crate::executor::ToolExecutor;
use crate::protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;
use serde_json::{Value, json};

/// The MCP server.
#[derive(Clone)]
pub struct McpServer {
    tools: ToolRegistry,
    executor: ToolExecutor,
}

impl McpServer {
    /// Create a server exposing the built-in tools.
    pub fn new(executor: ToolExecutor) -> Self {
        Self {
            tools: ToolRegistry::new(),
            executor,
        }
    }

    /// The tools this server advertises.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle one raw JSON-RPC message.
    pub async fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        let id = message.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed JSON-RPC message");
                Some(McpError::InvalidRequest(e.to_string()).to_response(id))
            }
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }

        let id = request.id.clone();
        tracing::debug!(method = %request.method, "Handling request");
        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.list() })),
            "tools/call" => self.handle_call_tool(request.params).await.and_then(|response| {
                serde_json::to_value(response).map_err(|e| McpError::Internal(e.to_string()))
            }),
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                tracing::warn!(method = %request.method, error = %e, "Request failed");
                e.to_response(id)
            }
        })
    }

    /// Invoke a tool by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<CallToolResponse, McpError> {
        if !self.tools.contains(name) {
            return Err(McpError::ToolNotFound {
                name: name.to_string(),
            });
        }
        tracing::info!(tool = name, "Calling tool");
        self.executor.invoke(name, arguments).await
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<CallToolResponse, McpError> {
        let params = params.ok_or_else(|| McpError::InvalidParams("missing params".into()))?;
        let params: CallToolParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;
        self.call_tool(&params.name, &params.arguments).await
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "papa-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        })
    }
}
