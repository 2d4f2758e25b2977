//! # papa-mcp
//!
//! MCP (Model Context Protocol) server for Papa.
//!
//! Two tools are exposed to agents:
//!
//! | Tool | Behaviour |
//! |------|-----------|
//! | `get_agent_output(user_message)` | Echoes the message with the current local time |
//! | `get_event_data(user_message)` | Question → SQL (LLM) → guard → Postgres → JSON rows |
//!
//! ## Architecture
//!
//! ```text
//! MCP client
//!     │ GET /sse                     ◄── event: endpoint  (/message?sessionId=…)
//!     │ POST /message?sessionId=…    ◄── event: message   (JSON-RPC response)
//!     ▼
//! ┌──────────────────────┐
//! │ http_transport       │  auth, 202/404/400, SSE framing
//! │ session              │  one worker per session, FIFO
//! │ server               │  JSON-RPC dispatch
//! │ executor             │  tool bodies
//! └──────────┬───────────┘
//!            ▼
//!   papa-llm → papa-sql → papa-db
//! ```

pub mod error;
pub mod executor;
pub mod http_transport;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use error::McpError;
pub use executor::{ToolError, ToolExecutor};
pub use http_transport::{AppState, HttpServer, create_router};
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use session::{SessionError, SessionHandle, SessionRegistry};
pub use tools::ToolRegistry;
