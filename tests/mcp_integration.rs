//! Integration tests for the MCP HTTP endpoint.
//!
//! These tests drive the full router (transport, batching, dispatch and tool
//! execution) in-process, with a mock recommendation backend where a tool
//! call needs one.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meetplanner_mcp::config::BackendConfig;
use meetplanner_mcp::mcp::{router, AppState, McpServer};

const SSE_AND_JSON: &str = "application/json, text/event-stream";

// =============================================================================
// Helpers
// =============================================================================

fn app_with_backend(base_url: &str) -> Router {
    let server = McpServer::from_config(&BackendConfig {
        base_url: base_url.to_string(),
        timeout_secs: Some(5),
    })
    .unwrap();
    router(AppState::new(server, "/mcp", Duration::from_secs(30)))
}

/// A router whose backend is never contacted.
fn app() -> Router {
    app_with_backend("http://127.0.0.1:8000")
}

async fn post(app: Router, accept: Option<&str>, body: impl Into<Body>) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    app.oneshot(builder.body(body.into()).unwrap()).await.unwrap()
}

async fn post_json(app: Router, accept: Option<&str>, message: &Value) -> Response {
    post(app, accept, message.to_string()).await
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_value(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Splits an SSE body into `(id, data)` pairs.
fn sse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(|block| {
            let mut id = String::new();
            let mut data = String::new();
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("id:") {
                    id = rest.trim_start().to_string();
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data.push_str(rest.trim_start());
                }
            }
            (id, serde_json::from_str(&data).unwrap())
        })
        .collect()
}

fn session_id(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// =============================================================================
// POST: Lifecycle
// =============================================================================

#[tokio::test]
async fn test_initialize_returns_json_and_session_id() {
    let response = post_json(
        app(),
        Some("application/json"),
        &json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            }
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("application/json"));
    let session = session_id(&response).unwrap();
    assert!(Uuid::parse_str(session).is_ok());

    assert_eq!(
        body_value(response).await,
        json!({
            "jsonrpc": "2.0",
            "result": {
                "protocolVersion": "2025-03-26",
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {"name": "meetplanner-mcp", "version": "1.0.0"}
            },
            "id": 1
        })
    );
}

#[tokio::test]
async fn test_each_initialize_gets_fresh_session_id() {
    let message = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"});
    let first = post_json(app(), None, &message).await;
    let second = post_json(app(), None, &message).await;

    let first = session_id(&first).unwrap().to_string();
    let second = session_id(&second).unwrap().to_string();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_non_initialize_has_no_session_id() {
    let response = post_json(
        app(),
        None,
        &json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_id(&response).is_none());
    assert_eq!(
        body_value(response).await,
        json!({"jsonrpc": "2.0", "result": {}, "id": 3})
    );
}

#[tokio::test]
async fn test_initialized_notification_is_accepted() {
    let response = post_json(
        app(),
        Some(SSE_AND_JSON),
        &json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(response).await.is_empty());
}

// =============================================================================
// POST: Response Modes
// =============================================================================

#[tokio::test]
async fn test_initialize_over_sse() {
    let response = post_json(
        app(),
        Some(SSE_AND_JSON),
        &json!({"jsonrpc": "2.0", "id": "init", "method": "initialize"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/event-stream"));
    assert!(session_id(&response).is_some());

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let events = sse_events(&body);
    assert_eq!(events.len(), 1);

    let (id, data) = &events[0];
    assert!(Uuid::parse_str(id).is_ok());
    assert_eq!(data["id"], "init");
    assert_eq!(data["result"]["protocolVersion"], "2025-03-26");
}

#[tokio::test]
async fn test_sse_event_framing() {
    let response = post_json(
        app(),
        Some("text/event-stream"),
        &json!({"jsonrpc": "2.0", "id": 21, "method": "ping"}),
    )
    .await;

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let event_id = body
        .strip_prefix("id: ")
        .and_then(|rest| rest.split_once('\n'))
        .map(|(id, _)| id)
        .unwrap();

    assert!(Uuid::parse_str(event_id).is_ok());
    assert_eq!(
        body,
        format!("id: {event_id}\ndata: {{\"jsonrpc\":\"2.0\",\"result\":{{}},\"id\":21}}\n\n")
    );
}

#[tokio::test]
async fn test_batch_returns_array_in_order() {
    let response = post_json(
        app(),
        Some("application/json"),
        &json!([
            {"jsonrpc": "2.0", "id": 1, "method": "ping"},
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "id": 2, "method": "tools/list"}
        ]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    let responses = body.as_array().unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(
        responses[1]["result"]["tools"][0]["name"],
        "recommend_meeting_place"
    );
}

#[tokio::test]
async fn test_batch_over_sse_is_one_event_per_response() {
    let response = post_json(
        app(),
        Some("text/event-stream"),
        &json!([
            {"jsonrpc": "2.0", "id": "a", "method": "ping"},
            {"jsonrpc": "2.0", "id": "b", "method": "ping"}
        ]),
    )
    .await;

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let events = sse_events(&body);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].1["id"], "a");
    assert_eq!(events[1].1["id"], "b");
    assert_ne!(events[0].0, events[1].0);
}

#[tokio::test]
async fn test_single_element_batch_is_unwrapped() {
    let response = post_json(
        app(),
        None,
        &json!([{"jsonrpc": "2.0", "id": 7, "method": "ping"}]),
    )
    .await;

    let body = body_value(response).await;
    assert!(body.is_object());
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn test_notification_only_batch_is_accepted() {
    let response = post_json(
        app(),
        None,
        &json!([
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
            {"jsonrpc": "2.0", "method": "notifications/cancelled", "params": {"requestId": 1}}
        ]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(response).await.is_empty());
}

// =============================================================================
// POST: Errors
// =============================================================================

#[tokio::test]
async fn test_unparseable_body_is_parse_error() {
    let response = post(app(), None, "{not json").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_value(response).await;
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn test_wrong_version_is_invalid_request() {
    let response = post_json(
        app(),
        None,
        &json!({"jsonrpc": "1.0", "id": 5, "method": "ping"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 5);
}

#[tokio::test]
async fn test_unknown_method() {
    let response = post_json(
        app(),
        None,
        &json!({"jsonrpc": "2.0", "id": 8, "method": "resources/list"}),
    )
    .await;

    let body = body_value(response).await;
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["error"]["message"], "Method not found: resources/list");
}

#[tokio::test]
async fn test_unknown_tool() {
    let response = post_json(
        app(),
        None,
        &json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "unknown_tool", "arguments": {}}
        }),
    )
    .await;

    let body = body_value(response).await;
    assert_eq!(body["error"]["code"], -32602);
    assert_eq!(body["error"]["message"], "Unknown tool: unknown_tool");
    assert_eq!(body["id"], 4);
}

// =============================================================================
// POST: Tool Calls
// =============================================================================

#[tokio::test]
async fn test_tool_call_success() {
    let backend = MockServer::start().await;
    let payload = json!({
        "recommendations": [
            {"rank": 1, "label": "Sindorim", "fairness": 0.92}
        ]
    });

    Mock::given(method("POST"))
        .and(path("/recommend"))
        .and(body_json(json!({
            "participants": [
                {"name": "Participant1", "origin_text": "강남역"},
                {"name": "Participant2", "origin_text": "홍대입구"}
            ],
            "purpose": "cafe_talk"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
        .expect(1)
        .mount(&backend)
        .await;

    let response = post_json(
        app_with_backend(&backend.uri()),
        None,
        &json!({
            "jsonrpc": "2.0",
            "id": 10,
            "method": "tools/call",
            "params": {
                "name": "recommend_meeting_place",
                "arguments": {
                    "participants": [
                        {"origin_text": "강남역"},
                        {"origin_text": "홍대입구"}
                    ]
                }
            }
        }),
    )
    .await;

    let body = body_value(response).await;
    let result = &body["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["type"], "text");

    let text = result["content"][0]["text"].as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();
    assert_eq!(parsed, payload);
}

#[tokio::test]
async fn test_tool_call_backend_rejection() {
    let backend = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/recommend"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"detail": "At least 2 participants required"})),
        )
        .mount(&backend)
        .await;

    let response = post_json(
        app_with_backend(&backend.uri()),
        None,
        &json!({
            "jsonrpc": "2.0",
            "id": 11,
            "method": "tools/call",
            "params": {
                "name": "recommend_meeting_place",
                "arguments": {
                    "participants": [{"name": "Solo", "origin_text": "Seoul"}],
                    "purpose": "study"
                }
            }
        }),
    )
    .await;

    let body = body_value(response).await;
    assert!(body.get("error").is_none());
    assert_eq!(
        body["result"],
        json!({
            "content": [{"type": "text", "text": "Error: At least 2 participants required"}],
            "isError": true
        })
    );
}

// =============================================================================
// GET / DELETE
// =============================================================================

#[tokio::test]
async fn test_get_without_sse_accept() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/mcp")
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_value(response).await,
        json!({"error": "Accept header must include text/event-stream"})
    );
}

#[tokio::test]
async fn test_get_opens_stream_with_keep_alive() {
    let server = McpServer::from_config(&BackendConfig::default()).unwrap();
    let app = router(AppState::new(server, "/mcp", Duration::from_millis(50)));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/mcp")
        .header(header::ACCEPT, "text/event-stream")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/event-stream"));

    let mut frames = response.into_body().into_data_stream();
    let opening = frames.next().await.unwrap().unwrap();
    assert!(opening.starts_with(b":"));

    let keep_alive = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&keep_alive).contains("keep-alive"));
}

#[tokio::test]
async fn test_stream_ends_when_closed() {
    let server = McpServer::from_config(&BackendConfig::default()).unwrap();
    let state = AppState::new(server, "/mcp", Duration::from_secs(30));
    let app = router(state.clone());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/mcp")
        .header(header::ACCEPT, "text/event-stream")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let mut frames = response.into_body().into_data_stream();
    let _opening = frames.next().await.unwrap().unwrap();

    state.close_streams();
    let end = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn test_delete_is_accepted() {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/mcp")
        .header("mcp-session-id", Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(response).await.is_empty());
}

// =============================================================================
// Auxiliary Routes
// =============================================================================

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_value(response).await,
        json!({"status": "ok", "service": "meetplanner-mcp"})
    );
}

#[tokio::test]
async fn test_discovery_document() {
    let request = Request::builder()
        .uri("/mcp.json")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_value(response).await;
    assert_eq!(doc["protocolVersion"], "2025-03-26");
    assert_eq!(doc["serverInfo"]["name"], "meetplanner-mcp");
    assert_eq!(doc["tools"][0]["name"], "recommend_meeting_place");
    assert_eq!(
        doc["transport"],
        json!({"type": "streamable-http", "path": "/mcp"})
    );
}

#[tokio::test]
async fn test_custom_mount_path() {
    let server = McpServer::from_config(&BackendConfig::default()).unwrap();
    let app = router(AppState::new(server, "/rpc", Duration::from_secs(30)));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/rpc")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
