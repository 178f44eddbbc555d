//! Streamable HTTP transport for the MCP server.
//!
//! One route path serves three methods:
//!
//! - **POST**: one JSON-RPC message or a batch. Answered with a JSON body,
//!   or an SSE stream of one event per response when the client accepts
//!   `text/event-stream`. Notification-only batches get a bodyless `202`.
//! - **GET**: a standing SSE stream for server-initiated messages. The
//!   server never queues any, so the stream only carries keep-alive comments.
//! - **DELETE**: session termination; acknowledged with `202`.
//!
//! Sessions are not tracked. `Mcp-Session-Id` is minted on every batch that
//! contains `initialize` and never checked afterwards.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::mcp::methods::{initialize_result, tools_list_result};
use crate::mcp::protocol::{parse_batch, Response, SERVER_NAME};
use crate::mcp::server::McpServer;

/// Header carrying the session identifier.
pub const MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");

/// Body of the `400` sent to a GET without an SSE `Accept` header.
pub const SSE_ACCEPT_REQUIRED: &str = "Accept header must include text/event-stream";

const EVENT_STREAM: &str = "text/event-stream";

/// Shared, read-only state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    server: Arc<McpServer>,
    path: String,
    keep_alive: Duration,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Creates handler state for an MCP endpoint mounted at `path`.
    #[must_use]
    pub fn new(server: McpServer, path: impl Into<String>, keep_alive: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            server: Arc::new(server),
            path: path.into(),
            keep_alive,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Ends every standing GET stream so connections can drain.
    pub fn close_streams(&self) {
        self.shutdown.send_replace(true);
    }
}

/// Builds the router: the MCP endpoint plus `/health` and `/mcp.json`.
pub fn router(state: AppState) -> Router {
    let path = state.path.clone();
    Router::new()
        .route(
            &path,
            get(handle_get).post(handle_post).delete(handle_delete),
        )
        .route("/health", get(handle_health))
        .route("/mcp.json", get(handle_discovery))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, path = %state.path, "Starting MCP HTTP server");
    }

    let streams = state.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            streams.close_streams();
        })
        .await
}

async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    let messages = match parse_batch(&body) {
        Ok(messages) => messages,
        Err(error) => {
            warn!(bytes = body.len(), "Request body is not valid JSON");
            return (StatusCode::BAD_REQUEST, Json(Response::from(error))).into_response();
        }
    };

    debug!(messages = messages.len(), "Processing batch");
    let outcome = state.server.handle_batch(messages).await;

    if !outcome.has_requests || outcome.responses.is_empty() {
        return StatusCode::ACCEPTED.into_response();
    }

    let mut response = if accepts_event_stream(&headers) {
        event_stream_response(outcome.responses)
    } else {
        json_response(outcome.responses)
    };

    if outcome.initialize_seen {
        let session_id = Uuid::new_v4().to_string();
        if let Ok(value) = HeaderValue::from_str(&session_id) {
            info!(session_id = %session_id, "Issued session id");
            response.headers_mut().insert(MCP_SESSION_ID, value);
        }
    }

    response
}

/// A single response is sent bare; several as an array.
fn json_response(mut responses: Vec<Response>) -> HttpResponse {
    if responses.len() == 1 {
        if let Some(only) = responses.pop() {
            return Json(only).into_response();
        }
    }
    Json(responses).into_response()
}

/// One SSE event per response, each with a fresh id; the stream then ends.
fn event_stream_response(responses: Vec<Response>) -> HttpResponse {
    let events = responses.into_iter().map(|response| {
        Event::default()
            .id(Uuid::new_v4().to_string())
            .json_data(&response)
    });
    Sse::new(stream::iter(events)).into_response()
}

async fn handle_get(State(state): State<AppState>, headers: HeaderMap) -> HttpResponse {
    if !accepts_event_stream(&headers) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": SSE_ACCEPT_REQUIRED })),
        )
            .into_response();
    }

    let guard = StreamGuard::open();
    let stream = standing_stream(guard, state.shutdown.subscribe());
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(state.keep_alive)
                .text("keep-alive"),
        )
        .into_response()
}

/// Logs the lifetime of one standing GET stream.
///
/// Owned by the stream, so it drops together with the keep-alive timer when
/// the client disconnects or the server shuts down.
struct StreamGuard {
    id: Uuid,
}

impl StreamGuard {
    fn open() -> Self {
        let id = Uuid::new_v4();
        info!(stream_id = %id, "SSE stream opened");
        Self { id }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        info!(stream_id = %self.id, "SSE stream closed");
    }
}

/// An opening comment, then nothing until shutdown.
///
/// A dropped shutdown sender means no shutdown will ever be signalled, so the
/// stream then stays open until the client goes away.
fn standing_stream(
    guard: StreamGuard,
    mut shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let opening = stream::once(async { Ok(Event::default().comment("stream open")) });
    let idle = stream::once(async move {
        if shutdown.wait_for(|closing| *closing).await.is_err() {
            std::future::pending::<()>().await;
        }
        drop(guard);
    })
    .filter_map(|()| async { None::<Result<Event, Infallible>> });
    opening.chain(idle)
}

async fn handle_delete(headers: HeaderMap) -> StatusCode {
    let session_id = header_str(&headers, MCP_SESSION_ID.as_str()).unwrap_or("<none>");
    info!(session_id = %session_id, "Session termination requested");
    StatusCode::ACCEPTED
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVER_NAME }))
}

/// Static discovery document.
async fn handle_discovery(State(state): State<AppState>) -> Json<Value> {
    let mut doc = initialize_result();
    if let Value::Object(ref mut obj) = doc {
        obj.insert("tools".to_string(), tools_list_result()["tools"].clone());
        obj.insert(
            "transport".to_string(),
            json!({ "type": "streamable-http", "path": state.path }),
        );
    }
    Json(doc)
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains(EVENT_STREAM))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}
