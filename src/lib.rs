//! meetplanner-mcp: MCP server for fair meeting-place recommendations
//!
//! This library exposes a single tool, `recommend_meeting_place`, to AI
//! assistants over the MCP streamable HTTP transport.
//!
//! # Architecture
//!
//! The MCP server is a thin protocol layer. The recommendation backend does
//! the actual work:
//!
//! - **Transport**: JSON-RPC 2.0 over HTTP POST, with JSON or SSE responses
//! - **Dispatch**: `initialize`, `tools/list`, `tools/call`, `ping` and the
//!   lifecycle notifications
//! - **Tool execution**: one `POST /recommend` call per tool invocation
//!
//! The backend (not this crate) handles geocoding, transit times, fairness
//! scoring and venue search.
//!
//! # Modules
//!
//! - [`backend`] — Recommendation backend client
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation

pub mod backend;
pub mod config;
pub mod error;
pub mod mcp;
