//! The MCP client session.
//!
//! The client owns a transport and one background reader task draining it.
//! Responses are resolved against the pending table; server-initiated
//! notifications fan out to subscribers in arrival order; the session state
//! machine (`Created → Initializing → Ready → Closing → Closed`, with
//! `Failed` terminal) gates application traffic behind the initialize
//! handshake.

use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;

use conduit_mcp_types::CallToolRequest;
use conduit_mcp_types::CallToolRequestParams;
use conduit_mcp_types::CallToolResult;
use conduit_mcp_types::GetPromptRequest;
use conduit_mcp_types::GetPromptRequestParams;
use conduit_mcp_types::GetPromptResult;
use conduit_mcp_types::Implementation;
use conduit_mcp_types::InitializeResult;
use conduit_mcp_types::JSONRPC_VERSION;
use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::JSONRPCNotification;
use conduit_mcp_types::JSONRPCRequest;
use conduit_mcp_types::JSONRPCResponse;
use conduit_mcp_types::ListPromptsRequest;
use conduit_mcp_types::ListPromptsRequestParams;
use conduit_mcp_types::ListPromptsResult;
use conduit_mcp_types::ListResourcesRequest;
use conduit_mcp_types::ListResourcesRequestParams;
use conduit_mcp_types::ListResourcesResult;
use conduit_mcp_types::ListToolsRequest;
use conduit_mcp_types::ListToolsRequestParams;
use conduit_mcp_types::ListToolsResult;
use conduit_mcp_types::LoggingLevel;
use conduit_mcp_types::LoggingMessageNotificationParams;
use conduit_mcp_types::ModelContextProtocolRequest;
use conduit_mcp_types::PingRequest;
use conduit_mcp_types::ProtocolVersion;
use conduit_mcp_types::ReadResourceRequest;
use conduit_mcp_types::ReadResourceRequestParams;
use conduit_mcp_types::ReadResourceResult;
use conduit_mcp_types::RequestId;
use conduit_mcp_types::ResourceUpdatedNotificationParams;
use conduit_mcp_types::ServerCapabilities;
use conduit_mcp_types::ServerNotification;
use conduit_mcp_types::SetLevelRequest;
use conduit_mcp_types::SetLevelRequestParams;
use conduit_mcp_types::SubscribeRequest;
use conduit_mcp_types::SubscribeRequestParams;
use conduit_mcp_types::UnsubscribeRequest;
use conduit_mcp_types::UnsubscribeRequestParams;
use conduit_mcp_types::shape;
use conduit_rpc::RequestRouter;
use conduit_rpc::RpcError;
use conduit_rpc::error_code::METHOD_NOT_FOUND_ERROR_CODE;
use conduit_transport::InMemoryTransport;
use conduit_transport::StdioTransport;
use conduit_transport::Transport;
use conduit_transport::TransportEvent;
use conduit_transport::TransportRegistry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Initializing,
    Ready,
    Closing,
    Closed,
    Failed,
}

/// What the handshake pinned down. Immutable for the session's lifetime.
struct NegotiatedSession {
    version: ProtocolVersion,
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
}

#[derive(Default)]
struct Subscriptions {
    tools_changed: Mutex<Vec<mpsc::UnboundedSender<()>>>,
    prompts_changed: Mutex<Vec<mpsc::UnboundedSender<()>>>,
    resources_changed: Mutex<Vec<mpsc::UnboundedSender<()>>>,
    resource_updates:
        Mutex<HashMap<String, Vec<mpsc::UnboundedSender<ResourceUpdatedNotificationParams>>>>,
    log_messages: Mutex<Vec<mpsc::UnboundedSender<LoggingMessageNotificationParams>>>,
}

fn fan_out<T: Clone>(subscribers: &Mutex<Vec<mpsc::UnboundedSender<T>>>, value: &T) {
    if let Ok(mut guard) = subscribers.lock() {
        guard.retain(|tx| tx.send(value.clone()).is_ok());
    }
}

impl Subscriptions {
    fn dispatch(&self, notification: ServerNotification) {
        match notification {
            ServerNotification::ToolListChangedNotification(_) => {
                fan_out(&self.tools_changed, &());
            }
            ServerNotification::PromptListChangedNotification(_) => {
                fan_out(&self.prompts_changed, &());
            }
            ServerNotification::ResourceListChangedNotification(_) => {
                fan_out(&self.resources_changed, &());
            }
            ServerNotification::ResourceUpdatedNotification(params) => {
                if let Ok(mut guard) = self.resource_updates.lock() {
                    if let Some(subscribers) = guard.get_mut(&params.uri) {
                        subscribers.retain(|tx| tx.send(params.clone()).is_ok());
                    }
                }
            }
            ServerNotification::LoggingMessageNotification(params) => {
                fan_out(&self.log_messages, &params);
            }
            // Advisory only; the engine takes no action on receipt.
            ServerNotification::CancelledNotification(params) => {
                debug!("peer cancelled request {}", params.request_id);
            }
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.tools_changed.lock() {
            guard.clear();
        }
        if let Ok(mut guard) = self.prompts_changed.lock() {
            guard.clear();
        }
        if let Ok(mut guard) = self.resources_changed.lock() {
            guard.clear();
        }
        if let Ok(mut guard) = self.resource_updates.lock() {
            guard.clear();
        }
        if let Ok(mut guard) = self.log_messages.lock() {
            guard.clear();
        }
    }
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    router: RequestRouter,
    state: watch::Sender<SessionState>,
    negotiated: RwLock<Option<NegotiatedSession>>,
    subscriptions: Subscriptions,
    config: ClientConfig,
}

impl ClientInner {
    fn set_state(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Core request path: allocate an id, register the sink before the bytes
    /// leave (so an immediate response cannot be lost), arm the deadline.
    async fn request_value(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value, RpcError> {
        let (id, rx) = self.router.register().await;
        let message = JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.clone(),
            method: method.to_string(),
            params,
        });
        if let Err(e) = self.transport.send(message).await {
            self.router.forget(&id).await;
            return Err(e.into());
        }
        let outcome = match timeout {
            Some(duration) => match time::timeout(duration, rx).await {
                Ok(received) => received,
                Err(_) => {
                    // Deadline hit: remove the entry so a late response is
                    // dropped silently instead of completing a stale sink.
                    self.router.forget(&id).await;
                    return Err(RpcError::Timeout);
                }
            },
            None => rx.await,
        };
        match outcome {
            Ok(result) => result,
            Err(_) => Err(RpcError::TransportClosed),
        }
    }

    async fn send_notification_value(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), RpcError> {
        let message = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        });
        self.transport.send(message).await.map_err(RpcError::from)
    }

    async fn handle_message(&self, msg: JSONRPCMessage) {
        match msg {
            JSONRPCMessage::Response(JSONRPCResponse { id, result, .. }) => {
                self.router.complete_ok(&id, result).await;
            }
            JSONRPCMessage::Error(err) => {
                self.router.complete_err(&err.id, err.error).await;
            }
            JSONRPCMessage::Notification(notification) => {
                match ServerNotification::try_from(notification) {
                    Ok(server_notification) => self.subscriptions.dispatch(server_notification),
                    Err(e) => info!("<- unhandled notification: {e}"),
                }
            }
            JSONRPCMessage::Request(request) => self.handle_peer_request(request).await,
        }
    }

    /// Server→client requests. The core only answers `ping`; anything else
    /// gets `-32601` so the peer is never left hanging.
    async fn handle_peer_request(&self, request: JSONRPCRequest) {
        let JSONRPCRequest { id, method, .. } = request;
        let reply = if method == PingRequest::METHOD {
            JSONRPCMessage::Response(JSONRPCResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                result: json!({}),
            })
        } else {
            JSONRPCMessage::Error(conduit_mcp_types::JSONRPCError {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                error: conduit_mcp_types::JSONRPCErrorError {
                    code: METHOD_NOT_FOUND_ERROR_CODE,
                    message: "Method not found".to_string(),
                    data: None,
                },
            })
        };
        if let Err(e) = self.transport.send(reply).await {
            warn!("failed to answer server-initiated request: {e}");
        }
    }

    async fn on_transport_closed(&self) {
        self.router.fail_all().await;
        self.subscriptions.clear();
        let next = match self.current_state() {
            // Dying mid-handshake is a handshake failure.
            SessionState::Created | SessionState::Initializing => SessionState::Failed,
            SessionState::Failed => SessionState::Failed,
            _ => SessionState::Closed,
        };
        self.set_state(next);
    }
}

/// A running MCP client session over one transport connection.
pub struct McpClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient").finish_non_exhaustive()
    }
}

impl McpClient {
    /// Bind a session to an already-connected transport and start the reader
    /// task. The caller still drives [`initialize`](Self::initialize).
    pub fn connect(transport: Box<dyn Transport>, config: ClientConfig) -> Self {
        let (state_tx, _state_rx) = watch::channel(SessionState::Created);
        let inner = Arc::new(ClientInner {
            transport: Arc::from(transport),
            router: RequestRouter::new(),
            state: state_tx,
            negotiated: RwLock::new(None),
            subscriptions: Subscriptions::default(),
            config,
        });

        // Reader task: the transport's single consumer. This loop only
        // routes; nothing slow runs on it.
        {
            let inner = inner.clone();
            tokio::spawn(async move {
                loop {
                    match inner.transport.recv().await {
                        Some(TransportEvent::Message(msg)) => inner.handle_message(msg).await,
                        Some(TransportEvent::Batch(entries)) => {
                            for entry in entries {
                                match entry {
                                    conduit_rpc::BatchEntry::Valid(msg) => {
                                        inner.handle_message(msg).await;
                                    }
                                    conduit_rpc::BatchEntry::Invalid { id } => {
                                        warn!("invalid batch entry from server (id: {id:?})");
                                    }
                                }
                            }
                        }
                        Some(TransportEvent::Malformed(e)) => {
                            // The connection stays open; only this frame is
                            // lost.
                            warn!("dropping malformed frame from server: {e}");
                        }
                        Some(TransportEvent::Closed) => inner.on_transport_closed().await,
                        None => break,
                    }
                }
            });
        }

        Self { inner }
    }

    /// Spawn the given command and bind a session to its stdio.
    pub async fn new_stdio_client(
        program: OsString,
        args: Vec<OsString>,
        env: Option<HashMap<String, String>>,
        config: ClientConfig,
    ) -> Result<Self, RpcError> {
        let transport = StdioTransport::spawn(program, args, env)
            .await
            .map_err(RpcError::from)?;
        Ok(Self::connect(Box::new(transport), config))
    }

    /// Bind a session to one end of an in-memory pair.
    pub fn new_in_memory_client(transport: InMemoryTransport, config: ClientConfig) -> Self {
        Self::connect(Box::new(transport), config)
    }

    /// Build the transport named by `config.transport` through the registry
    /// and bind a session to it.
    pub async fn connect_with_registry(
        registry: &TransportRegistry,
        config: ClientConfig,
    ) -> Result<Self, RpcError> {
        let transport_config = config
            .transport
            .clone()
            .ok_or_else(|| RpcError::Transport("no transport configured".to_string()))?;
        let transport = registry
            .connect(&transport_config)
            .await
            .map_err(RpcError::from)?;
        Ok(Self::connect(transport, config))
    }

    pub fn state(&self) -> SessionState {
        self.inner.current_state()
    }

    /// Watch for state changes; completes when the session reaches `Ready`
    /// or a terminal state.
    pub async fn wait_ready(&self) -> Result<(), RpcError> {
        let mut rx = self.inner.state.subscribe();
        loop {
            let current = *rx.borrow();
            match current {
                SessionState::Ready => return Ok(()),
                SessionState::Failed => {
                    return Err(RpcError::Handshake("session failed".to_string()));
                }
                SessionState::Closing | SessionState::Closed => {
                    return Err(RpcError::TransportClosed);
                }
                _ => {}
            }
            if rx.changed().await.is_err() {
                return Err(RpcError::TransportClosed);
            }
        }
    }

    fn ensure_ready(&self) -> Result<(), RpcError> {
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Created | SessionState::Initializing => Err(RpcError::NotReady),
            SessionState::Closing | SessionState::Closed => Err(RpcError::TransportClosed),
            SessionState::Failed => Err(RpcError::Handshake("session failed".to_string())),
        }
    }

    fn fail_handshake(&self, reason: String) -> RpcError {
        self.inner.set_state(SessionState::Failed);
        RpcError::Handshake(reason)
    }

    /// Drive the initialize handshake: propose the configured revision,
    /// validate the server's pick, announce `notifications/initialized`, and
    /// open the ready gate.
    pub async fn initialize(&self) -> Result<InitializeResult, RpcError> {
        match self.state() {
            SessionState::Created => {}
            SessionState::Closing | SessionState::Closed => return Err(RpcError::TransportClosed),
            _ => {
                return Err(RpcError::Handshake(
                    "initialize called more than once".to_string(),
                ));
            }
        }
        self.inner.set_state(SessionState::Initializing);

        let proposal = self.inner.config.protocol_version.clone();
        // An unknown (future) proposal is rendered with the newest
        // conventions we know.
        let proposal_shape =
            ProtocolVersion::negotiate(&proposal).unwrap_or(ProtocolVersion::LATEST);
        let params = json!({
            "capabilities": shape::encode_client_capabilities(
                &self.inner.config.capabilities,
                proposal_shape,
            ),
            "clientInfo": shape::shape_implementation(
                &self.inner.config.client_info,
                proposal_shape,
            ),
            "protocolVersion": proposal,
        });

        let timeout = self.inner.config.request_timeout_sec;
        let value = match self
            .inner
            .request_value("initialize", Some(params), timeout)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                self.inner.set_state(SessionState::Failed);
                return Err(e);
            }
        };

        let Some(picked) = value.get("protocolVersion").and_then(|v| v.as_str()) else {
            return Err(
                self.fail_handshake("initialize response lacks protocolVersion".to_string())
            );
        };
        let negotiated: ProtocolVersion = match picked.parse() {
            Ok(version) => version,
            Err(e) => return Err(self.fail_handshake(e.to_string())),
        };
        if negotiated.as_str() > proposal.as_str() {
            return Err(self.fail_handshake(format!(
                "server picked {negotiated}, newer than proposed {proposal}"
            )));
        }
        let result = shape::decode_initialize_result(&value, negotiated)
            .map_err(|e| self.fail_handshake(format!("malformed initialize result: {e}")))?;

        self.inner.transport.set_protocol_version(negotiated);
        if let Ok(mut guard) = self.inner.negotiated.write() {
            *guard = Some(NegotiatedSession {
                version: negotiated,
                server_info: result.server_info.clone(),
                capabilities: result.capabilities.clone(),
                instructions: result.instructions.clone(),
            });
        }

        if let Err(e) = self
            .inner
            .send_notification_value("notifications/initialized", None)
            .await
        {
            self.inner.set_state(SessionState::Failed);
            return Err(e);
        }
        self.inner.set_state(SessionState::Ready);
        Ok(result)
    }

    /// Send an arbitrary MCP request and await the typed result. Fails
    /// locally with `NotReady` before the handshake completes; nothing
    /// reaches the transport in that case.
    pub async fn send_request<R>(
        &self,
        params: R::Params,
        timeout: Option<Duration>,
    ) -> Result<R::Result, RpcError>
    where
        R: ModelContextProtocolRequest,
        R::Params: Serialize,
        R::Result: DeserializeOwned,
    {
        self.ensure_ready()?;
        // For many request types `Params` is `Option<T>` and `None` should
        // be encoded as *absence* of the field.
        let params_json = serde_json::to_value(&params)?;
        let params_field = if params_json.is_null() {
            None
        } else {
            Some(params_json)
        };
        let timeout = timeout.or(self.inner.config.request_timeout_sec);
        let value = self
            .inner
            .request_value(R::METHOD, params_field, timeout)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Untyped request path for methods outside the closed helper set.
    /// Subject to the same ready gate and deadline handling.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value, RpcError> {
        self.ensure_ready()?;
        let timeout = timeout.or(self.inner.config.request_timeout_sec);
        self.inner.request_value(method, params, timeout).await
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), RpcError> {
        self.ensure_ready()?;
        self.inner.send_notification_value(method, params).await
    }

    /// Advise the peer that a request was abandoned locally. Purely
    /// advisory: no pending state changes on either side.
    pub async fn notify_cancelled(
        &self,
        request_id: RequestId,
        reason: Option<String>,
    ) -> Result<(), RpcError> {
        self.send_notification(
            "notifications/cancelled",
            Some(json!({ "requestId": request_id, "reason": reason })),
        )
        .await
    }

    pub async fn ping(&self, timeout: Option<Duration>) -> Result<(), RpcError> {
        self.send_request::<PingRequest>(None, timeout).await?;
        Ok(())
    }

    /// Convenience wrapper around `tools/list`.
    pub async fn list_tools(
        &self,
        params: Option<ListToolsRequestParams>,
        timeout: Option<Duration>,
    ) -> Result<ListToolsResult, RpcError> {
        self.send_request::<ListToolsRequest>(params, timeout).await
    }

    /// Convenience wrapper around `tools/call`.
    pub async fn call_tool(
        &self,
        name: String,
        arguments: Option<serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<CallToolResult, RpcError> {
        let params = CallToolRequestParams { arguments, name };
        debug!("MCP tool call: {params:?}");
        self.send_request::<CallToolRequest>(params, timeout).await
    }

    pub async fn list_prompts(
        &self,
        params: Option<ListPromptsRequestParams>,
        timeout: Option<Duration>,
    ) -> Result<ListPromptsResult, RpcError> {
        self.send_request::<ListPromptsRequest>(params, timeout)
            .await
    }

    pub async fn get_prompt(
        &self,
        name: String,
        arguments: Option<HashMap<String, String>>,
        timeout: Option<Duration>,
    ) -> Result<GetPromptResult, RpcError> {
        self.send_request::<GetPromptRequest>(GetPromptRequestParams { arguments, name }, timeout)
            .await
    }

    pub async fn list_resources(
        &self,
        params: Option<ListResourcesRequestParams>,
        timeout: Option<Duration>,
    ) -> Result<ListResourcesResult, RpcError> {
        self.send_request::<ListResourcesRequest>(params, timeout)
            .await
    }

    pub async fn read_resource(
        &self,
        uri: String,
        timeout: Option<Duration>,
    ) -> Result<ReadResourceResult, RpcError> {
        self.send_request::<ReadResourceRequest>(ReadResourceRequestParams { uri }, timeout)
            .await
    }

    /// Subscribe to updates for one resource URI. Registers the local
    /// subscriber first, then tells the server; updates arrive in the order
    /// the server emitted them.
    pub async fn subscribe_resource(
        &self,
        uri: String,
        timeout: Option<Duration>,
    ) -> Result<mpsc::UnboundedReceiver<ResourceUpdatedNotificationParams>, RpcError> {
        self.ensure_ready()?;
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.inner.subscriptions.resource_updates.lock() {
            guard.entry(uri.clone()).or_default().push(tx);
        }
        self.send_request::<SubscribeRequest>(SubscribeRequestParams { uri }, timeout)
            .await?;
        Ok(rx)
    }

    pub async fn unsubscribe_resource(
        &self,
        uri: String,
        timeout: Option<Duration>,
    ) -> Result<(), RpcError> {
        self.send_request::<UnsubscribeRequest>(
            UnsubscribeRequestParams { uri: uri.clone() },
            timeout,
        )
        .await?;
        if let Ok(mut guard) = self.inner.subscriptions.resource_updates.lock() {
            guard.remove(&uri);
        }
        Ok(())
    }

    pub async fn set_level(
        &self,
        level: LoggingLevel,
        timeout: Option<Duration>,
    ) -> Result<(), RpcError> {
        self.send_request::<SetLevelRequest>(SetLevelRequestParams { level }, timeout)
            .await?;
        Ok(())
    }

    pub fn subscribe_tools_changed(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.inner.subscriptions.tools_changed.lock() {
            guard.push(tx);
        }
        rx
    }

    pub fn subscribe_prompts_changed(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.inner.subscriptions.prompts_changed.lock() {
            guard.push(tx);
        }
        rx
    }

    pub fn subscribe_resources_changed(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.inner.subscriptions.resources_changed.lock() {
            guard.push(tx);
        }
        rx
    }

    pub fn subscribe_log_messages(
        &self,
    ) -> mpsc::UnboundedReceiver<LoggingMessageNotificationParams> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.inner.subscriptions.log_messages.lock() {
            guard.push(tx);
        }
        rx
    }

    /// Negotiated protocol revision, once `Ready`.
    pub fn negotiated_version(&self) -> Option<ProtocolVersion> {
        self.inner
            .negotiated
            .read()
            .ok()?
            .as_ref()
            .map(|n| n.version)
    }

    pub fn server_info(&self) -> Option<Implementation> {
        self.inner
            .negotiated
            .read()
            .ok()?
            .as_ref()
            .map(|n| n.server_info.clone())
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.inner
            .negotiated
            .read()
            .ok()?
            .as_ref()
            .map(|n| n.capabilities.clone())
    }

    pub fn instructions(&self) -> Option<String> {
        self.inner
            .negotiated
            .read()
            .ok()?
            .as_ref()
            .and_then(|n| n.instructions.clone())
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.transport.session_id()
    }

    /// Shut the session down: fail pending requests, close the transport,
    /// drop subscriptions. Idempotent; post-close operations fail with
    /// `TransportClosed` without mutating state.
    pub async fn close(&self) -> Result<(), RpcError> {
        match self.state() {
            SessionState::Closed | SessionState::Closing => return Ok(()),
            _ => {}
        }
        self.inner.set_state(SessionState::Closing);
        self.inner.router.fail_all().await;
        self.inner.subscriptions.clear();
        let _ = self.inner.transport.close().await;
        self.inner.set_state(SessionState::Closed);
        Ok(())
    }
}
