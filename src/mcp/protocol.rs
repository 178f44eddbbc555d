//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the core message types used in the Model Context Protocol.
//! All messages follow the JSON-RPC 2.0 specification.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Notification**: A one-way message (no `id`, never answered)
//! - **Response**: A reply to a request (`result` or `error`, never both)
//!
//! Classification is by presence of the `id` key, so `"id": null` is a
//! request whose response echoes `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version announced during `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "meetplanner-mcp";

/// Server version for capability negotiation.
pub const SERVER_VERSION: &str = "1.0.0";

/// The only accepted value of the `jsonrpc` member.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
    /// Explicit `null`, also used when the ID cannot be determined.
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect a response from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Request identifier, echoed in the response.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and never receive a response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcNotification {
    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    pub params: Option<Value>,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The result of the method call.
    pub result: Value,

    /// The request ID this response corresponds to.
    pub id: RequestId,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result,
            id,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters (also used for unknown tool names).
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for JsonRpcErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The error details.
    pub error: JsonRpcErrorData,

    /// The request ID this error corresponds to, `null` if unknown.
    pub id: RequestId,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: RequestId, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            error,
            id,
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(RequestId::Null, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates an invalid request error response with a custom message.
    #[must_use]
    pub fn invalid_request(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, message),
        )
    }
}

/// A response envelope: success or error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// `{jsonrpc, result, id}`.
    Success(JsonRpcResponse),
    /// `{jsonrpc, error, id}`.
    Error(JsonRpcError),
}

impl Response {
    /// Returns the ID this response is addressed to.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        match self {
            Self::Success(resp) => &resp.id,
            Self::Error(err) => &err.id,
        }
    }

    /// Returns the error payload, if this is an error response.
    #[must_use]
    pub const fn error(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Self::Success(_) => None,
            Self::Error(err) => Some(&err.error),
        }
    }
}

impl From<JsonRpcResponse> for Response {
    fn from(resp: JsonRpcResponse) -> Self {
        Self::Success(resp)
    }
}

impl From<JsonRpcError> for Response {
    fn from(err: JsonRpcError) -> Self {
        Self::Error(err)
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the parameters of this message.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Option::as_ref is not const
    pub fn params(&self) -> Option<&Value> {
        match self {
            Self::Request(req) => req.params.as_ref(),
            Self::Notification(notif) => notif.params.as_ref(),
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Why a raw value could not be turned into an [`IncomingMessage`].
#[derive(Debug, Clone)]
pub enum Rejection {
    /// Malformed envelope; the error is sent even for notification-shaped input.
    Answer(JsonRpcError),
    /// A malformed notification; nothing is sent.
    Silent,
}

/// Returns `true` if the raw message carries an `id` member.
#[must_use]
pub fn has_id(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| obj.contains_key("id"))
}

/// Extracts the `id` of a raw message for error reporting.
///
/// Missing or unusable IDs become [`RequestId::Null`].
#[must_use]
pub fn id_of(value: &Value) -> RequestId {
    value
        .get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
        .unwrap_or(RequestId::Null)
}

/// Classifies one raw JSON value as a request or notification.
///
/// # Errors
///
/// Returns [`Rejection::Answer`] with `-32600` if `jsonrpc` is not `"2.0"`
/// (checked before anything else, including for non-object input), or if a
/// request has an unusable `id` or no string `method`. The same defects on a
/// notification yield [`Rejection::Silent`].
pub fn parse_message(value: Value) -> Result<IncomingMessage, Rejection> {
    if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(Rejection::Answer(JsonRpcError::invalid_request(
            id_of(&value),
            "Invalid Request: jsonrpc must be 2.0",
        )));
    }

    let Value::Object(mut obj) = value else {
        // Only objects can carry a `jsonrpc` member.
        return Err(Rejection::Answer(JsonRpcError::invalid_request(
            RequestId::Null,
            "Invalid Request",
        )));
    };

    let params = obj.remove("params");
    let method = obj
        .remove("method")
        .and_then(|m| m.as_str().map(str::to_string));

    match obj.remove("id") {
        Some(raw_id) => {
            let id: RequestId = serde_json::from_value(raw_id).map_err(|_| {
                Rejection::Answer(JsonRpcError::invalid_request(
                    RequestId::Null,
                    "Invalid Request: id must be a string or number",
                ))
            })?;
            let Some(method) = method else {
                return Err(Rejection::Answer(JsonRpcError::invalid_request(
                    id,
                    "Invalid Request: method is required",
                )));
            };
            Ok(IncomingMessage::Request(JsonRpcRequest { id, method, params }))
        }
        None => method
            .map(|method| IncomingMessage::Notification(JsonRpcNotification { method, params }))
            .ok_or(Rejection::Silent),
    }
}

/// Splits an HTTP body into the raw messages of a batch.
///
/// A single object is a batch of one.
///
/// # Errors
///
/// Returns a parse error response if the body is not valid JSON.
pub fn parse_batch(body: &[u8]) -> Result<Vec<Value>, JsonRpcError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| JsonRpcError::parse_error())?;
    Ok(match value {
        Value::Array(items) => items,
        single => vec![single],
    })
}
