//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes the `recommend_meeting_place` tool to AI assistants
//! over the MCP streamable HTTP transport, using JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│   Methods   │    │
//! │   │ (HTTP, SSE) │    │  (batches)  │    │ (dispatch)  │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │                                                │            │
//! │                                                ▼            │
//! │                                         ┌─────────────┐    │
//! │                                         │    Tools    │────┼──▶ backend
//! │                                         └─────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2025-03-26.

pub mod methods;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{router, serve, AppState};
