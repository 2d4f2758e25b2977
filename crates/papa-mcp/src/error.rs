//! Error types for the MCP crate.

use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JsonRpcResponse, METHOD_NOT_FOUND,
};
use serde_json::Value;
use thiserror::Error;

/// Protocol-level failures. Tool failures are reported inside a
/// [`CallToolResponse`](crate::protocol::CallToolResponse) instead.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// The message is not a valid JSON-RPC request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown JSON-RPC method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Tool not found.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    /// Malformed method parameters.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound { .. } => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            _ => INTERNAL_ERROR,
        }
    }

    /// Render as a JSON-RPC error response.
    pub fn to_response(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_codes() {
        let missing = McpError::ToolNotFound {
            name: "nonexistent".into(),
        };
        assert_eq!(missing.code(), -32601);
        assert_eq!(McpError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(McpError::InvalidParams("x".into()).code(), -32602);
        assert_eq!(McpError::InvalidRequest("x".into()).code(), -32600);
        assert_eq!(McpError::Internal("x".into()).code(), -32603);

        let response = missing.to_response(Some(json!(7)));
        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "tool not found: nonexistent");
        assert_eq!(response.id, Some(json!(7)));
    }
}
