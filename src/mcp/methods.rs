//! Method dispatch.
//!
//! A stateless mapping from method name to behaviour. Nothing here knows
//! whether the caller is a request or a notification; suppressing responses
//! to notifications is the message processor's job.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::mcp::protocol::{
    ErrorCode, JsonRpcErrorData, MCP_PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};
use crate::mcp::tools::{
    recommend_tool_definition, ToolCallParams, ToolExecutor, RECOMMEND_TOOL_NAME,
};

/// Methods understood by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `notifications/initialized`
    Initialized,
    /// `notifications/cancelled`
    Cancelled,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `ping`
    Ping,
    /// Anything else.
    Unknown(String),
}

impl Method {
    /// Maps a wire method name to a [`Method`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "notifications/cancelled" => Self::Cancelled,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "ping" => Self::Ping,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// What a method produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutcome {
    /// A result value to send back.
    Reply(Value),
    /// Notification handlers produce nothing to send.
    NoReply,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        }
    }
}

/// The `initialize` result. Fixed; client parameters are ignored.
#[must_use]
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": ServerCapabilities::default(),
        "serverInfo": ServerInfo::default(),
    })
}

/// The `tools/list` result.
#[must_use]
pub fn tools_list_result() -> Value {
    json!({ "tools": [recommend_tool_definition()] })
}

/// Runs one method.
///
/// # Errors
///
/// - `-32601` for unknown methods
/// - `-32602` for malformed `tools/call` params or an unknown tool name
/// - `-32603` if a tool result cannot be serialised
pub async fn dispatch(
    method: &Method,
    params: Option<&Value>,
    tools: &ToolExecutor,
) -> Result<MethodOutcome, JsonRpcErrorData> {
    match method {
        Method::Initialize => Ok(MethodOutcome::Reply(initialize_result())),
        Method::Initialized => {
            debug!("Client reported initialised");
            Ok(MethodOutcome::NoReply)
        }
        Method::Cancelled => {
            // In-flight backend calls are not aborted.
            debug!(params = ?params, "Client cancelled a request");
            Ok(MethodOutcome::NoReply)
        }
        Method::ToolsList => Ok(MethodOutcome::Reply(tools_list_result())),
        Method::ToolsCall => call_tool(params, tools).await.map(MethodOutcome::Reply),
        Method::Ping => Ok(MethodOutcome::Reply(json!({}))),
        Method::Unknown(name) => Err(JsonRpcErrorData::with_message(
            ErrorCode::MethodNotFound,
            format!("Method not found: {name}"),
        )),
    }
}

async fn call_tool(
    params: Option<&Value>,
    tools: &ToolExecutor,
) -> Result<Value, JsonRpcErrorData> {
    let params: ToolCallParams = params
        .map(|p| serde_json::from_value(p.clone()))
        .transpose()
        .map_err(|e| {
            JsonRpcErrorData::with_message(
                ErrorCode::InvalidParams,
                format!("Invalid tool call params: {e}"),
            )
        })?
        .ok_or_else(|| {
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, "Missing tool call params")
        })?;

    if params.name != RECOMMEND_TOOL_NAME {
        return Err(JsonRpcErrorData::with_message(
            ErrorCode::InvalidParams,
            format!("Unknown tool: {}", params.name),
        ));
    }

    let result = tools.execute(&params.arguments).await;
    serde_json::to_value(&result).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise tool call result");
        JsonRpcErrorData::with_message(
            ErrorCode::InternalError,
            "Internal error: failed to serialise result",
        )
    })
}
