//! The `recommend_meeting_place` tool.
//!
//! Tool execution failures are not JSON-RPC errors: they come back as a
//! successful response whose result has `isError: true`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::backend::{BackendClient, Participant, DEFAULT_PURPOSE};

/// Name of the single registered tool.
pub const RECOMMEND_TOOL_NAME: &str = "recommend_meeting_place";

/// Meeting purposes accepted by the tool schema.
pub const PURPOSES: [&str; 8] = [
    "cafe_talk",
    "restaurant",
    "shopping",
    "business",
    "culture",
    "entertainment",
    "study",
    "date",
];

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result, prefixed with `"Error: "`.
    #[must_use]
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: format!("Error: {message}"),
            }],
            is_error: true,
        }
    }
}

/// Returns the definition advertised by `tools/list` and `/mcp.json`.
#[must_use]
pub fn recommend_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: RECOMMEND_TOOL_NAME.to_string(),
        description: Some(
            "Recommend a fair meeting location based on transit-time fairness and purpose."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "participants": {
                    "type": "array",
                    "description": "List of participants with their origin locations",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {
                                "type": "string",
                                "description": "Participant name"
                            },
                            "origin_text": {
                                "type": "string",
                                "description": "Origin location (address or place name, e.g., 강남역, 홍대입구)"
                            }
                        },
                        "required": ["origin_text"]
                    },
                    "minItems": 2
                },
                "purpose": {
                    "type": "string",
                    "description": "Meeting purpose",
                    "enum": PURPOSES,
                    "default": DEFAULT_PURPOSE
                }
            },
            "required": ["participants"]
        }),
    }
}

/// Runs the recommendation tool against the backend.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    backend: BackendClient,
}

impl ToolExecutor {
    /// Creates an executor that calls the given backend.
    #[must_use]
    pub const fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Executes `recommend_meeting_place` with raw tool arguments.
    ///
    /// Never fails: backend and transport errors are reported through
    /// [`ToolCallResult::is_error`].
    pub async fn execute(&self, arguments: &Value) -> ToolCallResult {
        let participants = participants_from(arguments);
        let purpose = arguments
            .get("purpose")
            .and_then(given)
            .cloned()
            .unwrap_or_else(|| Value::from(DEFAULT_PURPOSE));

        match self.backend.recommend(&participants, &purpose).await {
            Ok(payload) => {
                info!(
                    participants = participants.len(),
                    purpose = %purpose,
                    "Recommendation succeeded"
                );
                match serde_json::to_string_pretty(&payload) {
                    Ok(text) => ToolCallResult::text(text),
                    Err(e) => ToolCallResult::error(e),
                }
            }
            Err(e) => {
                warn!(error = %e, "Recommendation failed");
                ToolCallResult::error(e)
            }
        }
    }
}

/// Builds the backend participant list, naming anonymous entries
/// `Participant<n>` by 1-based position.
///
/// Values are forwarded untouched, whatever their JSON type. `origin_text` is
/// not validated here.
fn participants_from(arguments: &Value) -> Vec<Participant> {
    arguments
        .get("participants")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .enumerate()
                .map(|(idx, p)| Participant {
                    name: p
                        .get("name")
                        .and_then(given)
                        .cloned()
                        .unwrap_or_else(|| Value::from(format!("Participant{}", idx + 1))),
                    origin_text: p.get("origin_text").cloned(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Treats `null`, `false`, `0` and `""` as not given.
fn given(value: &Value) -> Option<&Value> {
    let unset = match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    };
    (!unset).then_some(value)
}
