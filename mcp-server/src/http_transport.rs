//! Streamable HTTP front-end.
//!
//! One endpoint path carries the whole protocol: POST for client→server
//! messages (responses inline as `application/json`, `202` for
//! notifications), GET for the server→client SSE stream, DELETE for
//! session teardown. Sessions are keyed by the `Mcp-Session-Id` header
//! issued on the initialize response; the `MCP-Protocol-Version` header is
//! enforced once the negotiated revision requires it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use axum::routing::any;
use bytes::Bytes;
use conduit_mcp_types::JSONRPCMessage;
use conduit_rpc::CodecError;
use conduit_rpc::IncomingPayload;
use conduit_rpc::decode_message;
use conduit_rpc::error_code::INVALID_REQUEST_ERROR_CODE;
use conduit_rpc::error_code::PARSE_ERROR_CODE;
use conduit_rpc::error_response_value;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::info;
use uuid::Uuid;

use crate::CHANNEL_CAPACITY;
use crate::message_processor::MessageProcessor;
use crate::outgoing_message::OutgoingMessage;
use crate::outgoing_message::OutgoingMessageSender;
use crate::server::McpServer;

const SESSION_ID_HEADER: &str = "mcp-session-id";
const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// The single endpoint path.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8123))
}

fn default_path() -> String {
    "/mcp".to_string()
}

/// One HTTP-backed session: its processor plus the SSE broadcast that
/// carries server-initiated messages.
struct HttpSession {
    processor: MessageProcessor,
    sse_tx: broadcast::Sender<String>,
}

impl HttpSession {
    fn new(server: Arc<McpServer>) -> Arc<Self> {
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();
        let processor = MessageProcessor::new(server, OutgoingMessageSender::new(outgoing_tx));
        let (sse_tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        // Pump: everything handlers enqueue (notifications, server→client
        // requests) goes to whoever holds the GET stream. Send errors just
        // mean nobody is listening right now.
        let pump_sse_tx = sse_tx.clone();
        tokio::spawn(async move {
            while let Some(outgoing_message) = outgoing_rx.recv().await {
                let value = outgoing_message.into_wire_value();
                match serde_json::to_string(&value) {
                    Ok(json) => {
                        let _ = pump_sse_tx.send(json);
                    }
                    Err(e) => debug!("failed to serialize sse payload: {e}"),
                }
            }
        });

        Arc::new(Self { processor, sse_tx })
    }
}

/// Shared state across all HTTP request handlers.
#[derive(Clone)]
struct HttpState {
    server: Arc<McpServer>,
    sessions: Arc<Mutex<HashMap<String, Arc<HttpSession>>>>,
}

/// Build the axum [`Router`] for the MCP-over-HTTP front-end.
pub fn build_router(server: Arc<McpServer>, path: &str) -> Router {
    let state = HttpState {
        server,
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };
    Router::new()
        .route(path, any(handle_mcp))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve_http(server: Arc<McpServer>, config: HttpServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("mcp http endpoint on http://{}{}", listener.local_addr()?, config.path);
    axum::serve(listener, build_router(server, &config.path)).await
}

async fn handle_mcp(
    State(state): State<HttpState>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == axum::http::Method::POST {
        handle_mcp_post(state, headers, body).await
    } else if method == axum::http::Method::GET {
        handle_mcp_sse(state, headers).await
    } else if method == axum::http::Method::DELETE {
        handle_mcp_delete(state, headers).await
    } else {
        StatusCode::METHOD_NOT_ALLOWED.into_response()
    }
}

fn json_error(status: StatusCode, body: serde_json::Value) -> Response {
    (
        status,
        [(CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

fn header_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn session_for_headers(
    state: &HttpState,
    headers: &HeaderMap,
) -> Result<(String, Arc<HttpSession>), Response> {
    let Some(session_id) = header_value(headers, SESSION_ID_HEADER) else {
        return Err((StatusCode::BAD_REQUEST, "missing Mcp-Session-Id header").into_response());
    };
    let sessions = state.sessions.lock().await;
    match sessions.get(session_id) {
        Some(session) => Ok((session_id.to_string(), session.clone())),
        None => Err((StatusCode::NOT_FOUND, "unknown session").into_response()),
    }
}

/// The 2025-06-18 revision requires `MCP-Protocol-Version` on every request
/// after initialize; missing or mismatched → 400.
fn check_protocol_version_header(session: &HttpSession, headers: &HeaderMap) -> Option<Response> {
    let version = session.processor.session().negotiated_version()?;
    if !conduit_mcp_types::shape::adapter(version).protocol_version_header {
        return None;
    }
    match header_value(headers, PROTOCOL_VERSION_HEADER) {
        Some(header) if header == version.as_str() => None,
        Some(_) | None => Some(
            (
                StatusCode::BAD_REQUEST,
                "missing or invalid MCP-Protocol-Version header",
            )
                .into_response(),
        ),
    }
}

/// `POST <path>` — one JSON-RPC message or batch per request body.
async fn handle_mcp_post(state: HttpState, headers: HeaderMap, body: Bytes) -> Response {
    let Ok(text) = std::str::from_utf8(&body) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            error_response_value(None, PARSE_ERROR_CODE, "Parse error: body is not UTF-8"),
        );
    };
    let payload = match decode_message(text) {
        Ok(payload) => payload,
        Err(CodecError::InvalidShape { id }) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                error_response_value(id.as_ref(), INVALID_REQUEST_ERROR_CODE, "Invalid Request"),
            );
        }
        Err(e) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                error_response_value(None, PARSE_ERROR_CODE, &format!("Parse error: {e}")),
            );
        }
    };

    // `initialize` opens a fresh session; the response carries its id.
    if let IncomingPayload::Single(JSONRPCMessage::Request(req)) = &payload {
        if req.method == "initialize" {
            let session = HttpSession::new(state.server.clone());
            let reply = session.processor.handle_request_message(req.clone()).await;
            let body = serde_json::to_value(&reply).unwrap_or(serde_json::Value::Null);
            // A rejected handshake gets no session id.
            if !matches!(reply, JSONRPCMessage::Response(_)) {
                return (
                    StatusCode::OK,
                    [(CONTENT_TYPE.as_str(), "application/json")],
                    body.to_string(),
                )
                    .into_response();
            }
            let session_id = Uuid::new_v4().to_string();
            {
                let mut sessions = state.sessions.lock().await;
                sessions.insert(session_id.clone(), session);
            }
            return (
                StatusCode::OK,
                [
                    (CONTENT_TYPE.as_str(), "application/json"),
                    (SESSION_ID_HEADER, session_id.as_str()),
                ],
                body.to_string(),
            )
                .into_response();
        }
    }

    let (_, session) = match session_for_headers(&state, &headers).await {
        Ok(found) => found,
        Err(response) => return response,
    };
    if let Some(rejection) = check_protocol_version_header(&session, &headers) {
        return rejection;
    }

    match payload {
        IncomingPayload::Single(JSONRPCMessage::Request(req)) => {
            let reply = session.processor.handle_request_message(req).await;
            let body = serde_json::to_value(&reply).unwrap_or(serde_json::Value::Null);
            (
                StatusCode::OK,
                [(CONTENT_TYPE, "application/json")],
                body.to_string(),
            )
                .into_response()
        }
        IncomingPayload::Single(JSONRPCMessage::Notification(n)) => {
            session.processor.process_notification(n).await;
            StatusCode::ACCEPTED.into_response()
        }
        IncomingPayload::Single(JSONRPCMessage::Response(r)) => {
            session.processor.process_response(r).await;
            StatusCode::ACCEPTED.into_response()
        }
        IncomingPayload::Single(JSONRPCMessage::Error(e)) => {
            session.processor.process_error(e).await;
            StatusCode::ACCEPTED.into_response()
        }
        IncomingPayload::Batch(entries) if entries.is_empty() => json_error(
            StatusCode::BAD_REQUEST,
            error_response_value(None, INVALID_REQUEST_ERROR_CODE, "Invalid Request"),
        ),
        IncomingPayload::Batch(entries) => {
            let responses = session.processor.process_batch(entries).await;
            if responses.is_empty() {
                // Notifications only.
                return StatusCode::ACCEPTED.into_response();
            }
            (
                StatusCode::OK,
                [(CONTENT_TYPE, "application/json")],
                serde_json::Value::Array(responses).to_string(),
            )
                .into_response()
        }
    }
}

/// `GET <path>` — the persistent SSE stream for server-initiated messages.
async fn handle_mcp_sse(state: HttpState, headers: HeaderMap) -> Response {
    let (session_id, session) = match session_for_headers(&state, &headers).await {
        Ok(found) => found,
        Err(response) => return response,
    };
    if let Some(rejection) = check_protocol_version_header(&session, &headers) {
        return rejection;
    }

    let mut broadcast_rx = session.sse_tx.subscribe();
    let (tx, rx) = mpsc::channel::<Result<Event, std::convert::Infallible>>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(data) => {
                    if tx.send(Ok(Event::default().data(data))).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("sse listener for {session_id} lagged by {skipped} messages");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// `DELETE <path>` — terminate the session server-side.
async fn handle_mcp_delete(state: HttpState, headers: HeaderMap) -> Response {
    let (session_id, session) = match session_for_headers(&state, &headers).await {
        Ok(found) => found,
        Err(response) => return response,
    };
    {
        let mut sessions = state.sessions.lock().await;
        sessions.remove(&session_id);
    }
    session.processor.on_disconnect().await;
    info!("session {session_id} deleted");
    StatusCode::NO_CONTENT.into_response()
}
