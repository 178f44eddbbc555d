//! MCP message processing.
//!
//! Each raw JSON-RPC message is handled in one step:
//!
//! 1. **Framing**: `jsonrpc` must be `"2.0"`; failures are always answered
//! 2. **Classification**: request (has `id`) or notification (no `id`)
//! 3. **Dispatch**: see [`crate::mcp::methods`]; a panicking handler becomes `-32603`
//! 4. **Envelope**: requests get `result` or `error`; notifications get nothing
//!
//! The server holds no per-session state. Every batch is processed from
//! scratch and `initialize` may be repeated freely.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::backend::BackendClient;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::mcp::methods::{dispatch, Method, MethodOutcome};
use crate::mcp::protocol::{
    has_id, parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcResponse, Rejection, Response,
};
use crate::mcp::tools::ToolExecutor;

/// What processing one HTTP body produced.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Responses in the order their messages arrived.
    pub responses: Vec<Response>,
    /// Whether any input message carried an `id`.
    pub has_requests: bool,
    /// Whether any input message named `initialize`.
    pub initialize_seen: bool,
}

/// The MCP message processor for meeting-place recommendations.
#[derive(Debug, Clone)]
pub struct McpServer {
    /// Runs the single registered tool.
    tools: ToolExecutor,
}

impl McpServer {
    /// Creates a server around an existing tool executor.
    #[must_use]
    pub const fn new(tools: ToolExecutor) -> Self {
        Self { tools }
    }

    /// Creates a server that calls the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self::new(ToolExecutor::new(BackendClient::new(config)?)))
    }

    /// Handles one raw message.
    ///
    /// Returns `None` when nothing must be sent: for every notification,
    /// whatever the dispatch outcome, and for malformed notifications.
    pub async fn handle_message(&self, raw: Value) -> Option<Response> {
        let message = match parse_message(raw) {
            Ok(message) => message,
            Err(Rejection::Answer(error)) => {
                warn!(id = %error.id, error = %error.error, "Rejected malformed message");
                return Some(error.into());
            }
            Err(Rejection::Silent) => {
                debug!("Dropped malformed notification");
                return None;
            }
        };

        let method = Method::parse(message.method());
        let outcome = catch_fault(
            message.method(),
            dispatch(&method, message.params(), &self.tools),
        )
        .await;
        envelope(message, outcome)
    }

    /// Handles every message of a batch in arrival order.
    pub async fn handle_batch(&self, messages: Vec<Value>) -> BatchOutcome {
        let has_requests = messages.iter().any(has_id);
        let initialize_seen = messages
            .iter()
            .any(|m| m.get("method").and_then(Value::as_str) == Some("initialize"));

        let mut responses = Vec::with_capacity(messages.len());
        for raw in messages {
            if let Some(response) = self.handle_message(raw).await {
                responses.push(response);
            }
        }

        BatchOutcome {
            responses,
            has_requests,
            initialize_seen,
        }
    }
}

/// Runs a method handler, turning a panic into `-32603`.
async fn catch_fault<F>(method: &str, handler: F) -> Result<MethodOutcome, JsonRpcErrorData>
where
    F: Future<Output = Result<MethodOutcome, JsonRpcErrorData>>,
{
    AssertUnwindSafe(handler)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let reason = panic_message(panic.as_ref());
            error!(method, reason, "Method handler panicked");
            Err(JsonRpcErrorData::with_message(
                ErrorCode::InternalError,
                format!("Internal error: {reason}"),
            ))
        })
}

/// Wraps a dispatch outcome for the wire; notifications get nothing.
fn envelope(
    message: IncomingMessage,
    outcome: Result<MethodOutcome, JsonRpcErrorData>,
) -> Option<Response> {
    match message {
        IncomingMessage::Notification(notif) => {
            if let Err(error) = outcome {
                debug!(method = %notif.method, error = %error, "Ignoring notification error");
            }
            None
        }
        IncomingMessage::Request(req) => {
            debug!(method = %req.method, id = %req.id, "Handled request");
            Some(match outcome {
                Ok(MethodOutcome::Reply(result)) => JsonRpcResponse::success(req.id, result).into(),
                // A notification-only method sent with an id is acknowledged.
                Ok(MethodOutcome::NoReply) => JsonRpcResponse::success(req.id, json!({})).into(),
                Err(error) => JsonRpcError::new(req.id, error).into(),
            })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown fault")
}
