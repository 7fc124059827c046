//! Streamable HTTP client transport.
//!
//! One endpoint URL. Client→server messages go out as POSTs; the server
//! answers inline (`application/json`), with a per-request SSE stream
//! (`text/event-stream`), or `202 Accepted` for notifications. Once the
//! server issues an `Mcp-Session-Id`, a persistent GET stream is opened for
//! server-initiated messages and the id is echoed on every request.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::ProtocolVersion;
use conduit_rpc::IncomingPayload;
use conduit_rpc::decode_message;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::warn;

use crate::HttpConfig;
use crate::Transport;
use crate::TransportError;
use crate::TransportEvent;

const SESSION_ID_HEADER: &str = "mcp-session-id";
const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

const CHANNEL_CAPACITY: usize = 128;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    extra_headers: HashMap<String, String>,
    auth_token: Option<String>,
    /// Assigned by the server on the initialize response; echoed on every
    /// subsequent request.
    session_id: RwLock<Option<String>>,
    /// Set once the session has negotiated a revision that requires the
    /// `MCP-Protocol-Version` header.
    protocol_version: RwLock<Option<&'static str>>,
    incoming_tx: mpsc::Sender<TransportEvent>,
    incoming_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    alive: Arc<AtomicBool>,
    closed: AtomicBool,
    listener_started: AtomicBool,
}

/// Forward one `text/event-stream` body into the incoming queue, one
/// JSON-RPC message per SSE event.
async fn drain_sse(response: reqwest::Response, incoming_tx: mpsc::Sender<TransportEvent>) {
    let mut events = response.bytes_stream().eventsource();
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                if event.data.is_empty() {
                    continue;
                }
                let outcome = match decode_message(&event.data) {
                    Ok(IncomingPayload::Single(msg)) => TransportEvent::Message(msg),
                    Ok(IncomingPayload::Batch(entries)) => TransportEvent::Batch(entries),
                    Err(e) => TransportEvent::Malformed(e),
                };
                if incoming_tx.send(outcome).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("sse stream error: {e}");
                return;
            }
        }
    }
}

impl HttpTransport {
    /// Build the transport. No network traffic happens until the first
    /// `send` (the initialize request, in practice).
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if config.allow_insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build()?;

        let url = format!("{}{}", config.base_url.trim_end_matches('/'), config.path);
        let (incoming_tx, incoming_rx) = mpsc::channel(CHANNEL_CAPACITY);

        Ok(Self {
            client,
            url,
            extra_headers: config.headers.clone(),
            auth_token: config.auth_token.clone(),
            session_id: RwLock::new(None),
            protocol_version: RwLock::new(None),
            incoming_tx,
            incoming_rx: Mutex::new(incoming_rx),
            alive: Arc::new(AtomicBool::new(true)),
            closed: AtomicBool::new(false),
            listener_started: AtomicBool::new(false),
        })
    }

    fn apply_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (name, value) in &self.extra_headers {
            req = req.header(name, value);
        }
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }
        if let Some(session_id) = self.session_id.read().ok().and_then(|g| g.clone()) {
            req = req.header(SESSION_ID_HEADER, session_id);
        }
        if let Some(version) = self.protocol_version.read().ok().and_then(|g| *g) {
            req = req.header(PROTOCOL_VERSION_HEADER, version);
        }
        req
    }

    fn capture_session_id(&self, response: &reqwest::Response) {
        let Some(value) = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        if let Ok(mut guard) = self.session_id.write() {
            if guard.as_deref() != Some(value) {
                debug!("mcp session id: {value}");
                *guard = Some(value.to_string());
            }
        }
    }

    /// Open the persistent GET stream for server-initiated messages on a
    /// background task. Called lazily on the first request that already
    /// carries the session id (and protocol-version header, when required),
    /// so the server sees a fully-credentialed stream request. Losing the
    /// stream is logged; reconnecting is the application's decision.
    fn spawn_listener(&self) {
        let req = self
            .apply_headers(self.client.get(&self.url))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let incoming_tx = self.incoming_tx.clone();
        tokio::spawn(async move {
            match req.send().await {
                Ok(response) if response.status().is_success() => {
                    drain_sse(response, incoming_tx).await;
                    warn!("server→client sse stream ended");
                }
                Ok(response) => warn!("server declined the sse stream: {}", response.status()),
                Err(e) => warn!("failed to open the sse stream: {e}"),
            }
        });
    }

    async fn push_decoded(&self, raw: &str) {
        let outcome = match decode_message(raw) {
            Ok(IncomingPayload::Single(msg)) => TransportEvent::Message(msg),
            Ok(IncomingPayload::Batch(entries)) => TransportEvent::Batch(entries),
            Err(e) => TransportEvent::Malformed(e),
        };
        let _ = self.incoming_tx.send(outcome).await;
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, msg: JSONRPCMessage) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError::Closed);
        }

        let has_session = self.session_id.read().ok().is_some_and(|g| g.is_some());
        if has_session && !self.listener_started.swap(true, Ordering::SeqCst) {
            self.spawn_listener();
        }

        let req = self
            .apply_headers(self.client.post(&self.url))
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(&msg);
        let response = req.send().await?;
        self.capture_session_id(&response);

        let status = response.status();
        if status == reqwest::StatusCode::ACCEPTED {
            // Valid empty acknowledgement for a notification.
            return Ok(());
        }
        if !status.is_success() {
            // A 4xx/5xx whose body is a well-formed JSON-RPC error still
            // surfaces through the normal correlation path.
            let body = response.text().await.unwrap_or_default();
            if let Ok(IncomingPayload::Single(err_msg @ JSONRPCMessage::Error(_))) =
                decode_message(&body)
            {
                let _ = self
                    .incoming_tx
                    .send(TransportEvent::Message(err_msg))
                    .await;
                return Ok(());
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type.starts_with("text/event-stream") {
            let incoming_tx = self.incoming_tx.clone();
            tokio::spawn(async move {
                drain_sse(response, incoming_tx).await;
            });
            return Ok(());
        }

        let body = response.text().await?;
        if !body.is_empty() {
            self.push_decoded(&body).await;
        }
        Ok(())
    }

    async fn recv(&self) -> Option<TransportEvent> {
        self.incoming_rx.lock().await.recv().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.alive.store(false, Ordering::SeqCst);

        // Best-effort server-side teardown.
        let has_session = self.session_id.read().ok().is_some_and(|g| g.is_some());
        if has_session {
            let req = self.apply_headers(self.client.delete(&self.url));
            if let Err(e) = req.send().await {
                debug!("session delete failed: {e}");
            }
        }

        let _ = self.incoming_tx.send(TransportEvent::Closed).await;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|g| g.clone())
    }

    fn set_protocol_version(&self, version: ProtocolVersion) {
        if conduit_mcp_types::shape::adapter(version).protocol_version_header {
            if let Ok(mut guard) = self.protocol_version.write() {
                *guard = Some(version.as_str());
            }
        }
    }
}
