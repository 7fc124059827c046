//! Per-session message dispatch.
//!
//! One `MessageProcessor` drives one session regardless of the transport
//! underneath. Requests are answered in arrival order; batches aggregate
//! their responses into a single array preserving entry order; nothing a
//! peer sends can panic this code.

use std::sync::Arc;

use conduit_mcp_types::CallToolRequestParams;
use conduit_mcp_types::CallToolResult;
use conduit_mcp_types::ClientNotification;
use conduit_mcp_types::ClientRequest;
use conduit_mcp_types::ContentBlock;
use conduit_mcp_types::ConversionError;
use conduit_mcp_types::GetPromptRequestParams;
use conduit_mcp_types::GetPromptResult;
use conduit_mcp_types::InitializeRequestParams;
use conduit_mcp_types::InitializeResult;
use conduit_mcp_types::JSONRPC_VERSION;
use conduit_mcp_types::JSONRPCError;
use conduit_mcp_types::JSONRPCErrorError;
use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::JSONRPCNotification;
use conduit_mcp_types::JSONRPCRequest;
use conduit_mcp_types::JSONRPCResponse;
use conduit_mcp_types::ListPromptsResult;
use conduit_mcp_types::ListResourcesResult;
use conduit_mcp_types::ListToolsResult;
use conduit_mcp_types::ProtocolVersion;
use conduit_mcp_types::ReadResourceRequestParams;
use conduit_mcp_types::ReadResourceResult;
use conduit_mcp_types::RequestId;
use conduit_mcp_types::ServerCapabilities;
use conduit_mcp_types::ServerCapabilitiesPrompts;
use conduit_mcp_types::ServerCapabilitiesResources;
use conduit_mcp_types::ServerCapabilitiesTools;
use conduit_mcp_types::SetLevelRequestParams;
use conduit_mcp_types::SubscribeRequestParams;
use conduit_mcp_types::UnsubscribeRequestParams;
use conduit_mcp_types::shape;
use conduit_rpc::BatchEntry;
use conduit_rpc::CodecError;
use conduit_rpc::IncomingPayload;
use conduit_rpc::error_code::INTERNAL_ERROR_CODE;
use conduit_rpc::error_code::INVALID_PARAMS_ERROR_CODE;
use conduit_rpc::error_code::INVALID_REQUEST_ERROR_CODE;
use conduit_rpc::error_code::METHOD_NOT_FOUND_ERROR_CODE;
use conduit_rpc::error_code::PARSE_ERROR_CODE;
use conduit_rpc::error_response_value;
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::outgoing_message::OutgoingMessageSender;
use crate::server::McpServer;
use crate::server::Negotiated;
use crate::server::SessionHandle;
use crate::server::SessionPhase;

pub(crate) struct MessageProcessor {
    server: Arc<McpServer>,
    handle: Arc<SessionHandle>,
}

fn response_message<T: Serialize>(id: RequestId, result: T) -> JSONRPCMessage {
    match serde_json::to_value(result) {
        Ok(result) => JSONRPCMessage::Response(JSONRPCResponse {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result,
        }),
        Err(err) => error_message(
            id,
            INTERNAL_ERROR_CODE,
            format!("failed to serialize response: {err}"),
            None,
        ),
    }
}

fn error_message(
    id: RequestId,
    code: i64,
    message: impl Into<String>,
    data: Option<serde_json::Value>,
) -> JSONRPCMessage {
    JSONRPCMessage::Error(JSONRPCError {
        jsonrpc: JSONRPC_VERSION.into(),
        id,
        error: JSONRPCErrorError {
            code,
            message: message.into(),
            data,
        },
    })
}

impl MessageProcessor {
    /// Create a new `MessageProcessor`, retaining a handle to the outgoing
    /// `Sender` so handlers can enqueue messages to the peer.
    pub(crate) fn new(server: Arc<McpServer>, outgoing: OutgoingMessageSender) -> Self {
        let handle = Arc::new(SessionHandle::new(Arc::new(outgoing)));
        server.attach_session(&handle);
        Self { server, handle }
    }

    pub(crate) fn session(&self) -> Arc<SessionHandle> {
        self.handle.clone()
    }

    pub(crate) async fn process_payload(&self, payload: IncomingPayload) {
        match payload {
            IncomingPayload::Single(msg) => self.process_message(msg).await,
            IncomingPayload::Batch(entries) if entries.is_empty() => {
                self.handle
                    .outgoing
                    .send_raw(error_response_value(
                        None,
                        INVALID_REQUEST_ERROR_CODE,
                        "Invalid Request",
                    ))
                    .await;
            }
            IncomingPayload::Batch(entries) => {
                let responses = self.process_batch(entries).await;
                if !responses.is_empty() {
                    self.handle
                        .outgoing
                        .send_raw(serde_json::Value::Array(responses))
                        .await;
                }
            }
        }
    }

    /// Process every batch entry in order and return the per-entry responses
    /// (notifications contribute none), already rendered to wire values.
    pub(crate) async fn process_batch(
        &self,
        entries: Vec<BatchEntry>,
    ) -> Vec<serde_json::Value> {
        let mut responses = Vec::new();
        for entry in entries {
            match entry {
                BatchEntry::Valid(JSONRPCMessage::Request(req)) => {
                    let reply = self.handle_request_message(req).await;
                    match serde_json::to_value(reply) {
                        Ok(value) => responses.push(value),
                        Err(err) => warn!("failed to serialize batch response: {err}"),
                    }
                }
                BatchEntry::Valid(JSONRPCMessage::Notification(n)) => {
                    self.process_notification(n).await;
                }
                BatchEntry::Valid(JSONRPCMessage::Response(r)) => self.process_response(r).await,
                BatchEntry::Valid(JSONRPCMessage::Error(e)) => self.process_error(e).await,
                BatchEntry::Invalid { id } => {
                    responses.push(error_response_value(
                        id.as_ref(),
                        INVALID_REQUEST_ERROR_CODE,
                        "Invalid Request",
                    ));
                }
            }
        }
        responses
    }

    pub(crate) async fn process_message(&self, msg: JSONRPCMessage) {
        match msg {
            JSONRPCMessage::Request(r) => self.process_request(r).await,
            JSONRPCMessage::Response(r) => self.process_response(r).await,
            JSONRPCMessage::Notification(n) => self.process_notification(n).await,
            JSONRPCMessage::Error(e) => self.process_error(e).await,
        }
    }

    pub(crate) async fn process_request(&self, request: JSONRPCRequest) {
        let reply = self.handle_request_message(request).await;
        match reply {
            JSONRPCMessage::Response(r) => {
                self.handle.outgoing.send_response(r.id, r.result).await;
            }
            JSONRPCMessage::Error(e) => self.handle.outgoing.send_error(e.id, e.error).await,
            other => debug!("request handler produced a non-reply: {other:?}"),
        }
    }

    /// Compute the reply for one request. Every request gets exactly one
    /// reply message; the caller decides how to ship it (directly, or
    /// aggregated into a batch array, or inline in an HTTP response).
    pub(crate) async fn handle_request_message(&self, request: JSONRPCRequest) -> JSONRPCMessage {
        // Hold on to the ID so we can respond.
        let request_id = request.id.clone();

        let client_request = match ClientRequest::try_from(request) {
            Ok(client_request) => client_request,
            Err(ConversionError::UnknownMethod(method)) => {
                debug!("unknown method `{method}`");
                return error_message(
                    request_id,
                    METHOD_NOT_FOUND_ERROR_CODE,
                    "Method not found",
                    None,
                );
            }
            Err(e @ ConversionError::InvalidParams { .. }) => {
                return error_message(request_id, INVALID_PARAMS_ERROR_CODE, e.to_string(), None);
            }
        };

        // Everything except the handshake itself and ping waits behind the
        // ready gate.
        match &client_request {
            ClientRequest::InitializeRequest(_) | ClientRequest::PingRequest(_) => {}
            _ => {
                if self.handle.phase() != SessionPhase::Ready {
                    return error_message(
                        request_id,
                        INVALID_REQUEST_ERROR_CODE,
                        "server not initialized",
                        None,
                    );
                }
            }
        }

        match client_request {
            ClientRequest::InitializeRequest(params) => {
                self.handle_initialize(request_id, params).await
            }
            ClientRequest::PingRequest(params) => {
                debug!("ping -> params: {params:?}");
                response_message(request_id, json!({}))
            }
            ClientRequest::ListToolsRequest(params) => {
                debug!("tools/list -> {params:?}");
                response_message(
                    request_id,
                    ListToolsResult {
                        next_cursor: None,
                        tools: self.server.tools.list(),
                    },
                )
            }
            ClientRequest::CallToolRequest(params) => {
                self.handle_call_tool(request_id, params).await
            }
            ClientRequest::ListPromptsRequest(params) => {
                debug!("prompts/list -> {params:?}");
                response_message(
                    request_id,
                    ListPromptsResult {
                        next_cursor: None,
                        prompts: self.server.prompts.list(),
                    },
                )
            }
            ClientRequest::GetPromptRequest(params) => self.handle_get_prompt(request_id, params),
            ClientRequest::ListResourcesRequest(params) => {
                debug!("resources/list -> {params:?}");
                response_message(
                    request_id,
                    ListResourcesResult {
                        next_cursor: None,
                        resources: self.server.resources.list(),
                    },
                )
            }
            ClientRequest::ReadResourceRequest(params) => {
                self.handle_read_resource(request_id, params).await
            }
            ClientRequest::SubscribeRequest(params) => self.handle_subscribe(request_id, params),
            ClientRequest::UnsubscribeRequest(params) => {
                self.handle_unsubscribe(request_id, params)
            }
            ClientRequest::SetLevelRequest(params) => self.handle_set_level(request_id, params),
        }
    }

    async fn handle_initialize(
        &self,
        id: RequestId,
        params: InitializeRequestParams,
    ) -> JSONRPCMessage {
        info!("initialize -> params: {params:?}");

        if self.handle.phase() != SessionPhase::Created {
            return error_message(
                id,
                INVALID_REQUEST_ERROR_CODE,
                "initialize called more than once",
                None,
            );
        }

        let Some(version) = ProtocolVersion::negotiate(&params.protocol_version) else {
            // No acceptable revision: reject the handshake and park the
            // session in its terminal state.
            self.handle.set_phase(SessionPhase::Failed);
            let supported: Vec<&str> =
                ProtocolVersion::ALL.iter().map(|v| v.as_str()).collect();
            return error_message(
                id,
                INVALID_PARAMS_ERROR_CODE,
                "unsupported protocol version",
                Some(json!({
                    "supported": supported,
                    "requested": params.protocol_version,
                })),
            );
        };

        self.handle.set_negotiated(Negotiated {
            version,
            client_info: params.client_info,
            client_capabilities: params.capabilities,
        });
        self.handle.set_phase(SessionPhase::Initializing);

        let result = InitializeResult {
            capabilities: server_capabilities(),
            instructions: self.server.config.instructions.clone(),
            protocol_version: version.to_string(),
            server_info: self.server.config.server_info.clone(),
        };
        // The initialize result is the one payload whose wire shape depends
        // on the revision that was just picked.
        response_message(id, shape::encode_initialize_result(&result, version))
    }

    async fn handle_call_tool(
        &self,
        id: RequestId,
        params: CallToolRequestParams,
    ) -> JSONRPCMessage {
        info!("tools/call -> params: {params:?}");
        let CallToolRequestParams { arguments, name } = params;

        let Some(entry) = self.server.tools.get(&name) else {
            let result = CallToolResult {
                content: vec![ContentBlock::text(format!("Unknown tool '{name}'"))],
                is_error: Some(true),
                structured_content: None,
            };
            return response_message(id, result);
        };

        // Run the handler on its own task so a panicking tool degrades into
        // an isError result instead of taking the session down.
        let handler = entry.handler.clone();
        let joined = tokio::spawn(async move { handler.call(arguments).await }).await;
        let result = match joined {
            Ok(Ok(output)) => CallToolResult {
                content: output.content,
                is_error: Some(false),
                structured_content: output.structured_content,
            },
            Ok(Err(tool_error)) => CallToolResult {
                content: vec![ContentBlock::text(tool_error.to_string())],
                is_error: Some(true),
                structured_content: None,
            },
            Err(join_error) => {
                warn!("tool '{name}' panicked: {join_error}");
                CallToolResult {
                    content: vec![ContentBlock::text(format!("tool '{name}' failed"))],
                    is_error: Some(true),
                    structured_content: None,
                }
            }
        };

        let version = self
            .handle
            .negotiated_version()
            .unwrap_or(ProtocolVersion::LATEST);
        response_message(id, shape::shape_tool_result(result, version))
    }

    fn handle_get_prompt(&self, id: RequestId, params: GetPromptRequestParams) -> JSONRPCMessage {
        info!("prompts/get -> params: {params:?}");
        let GetPromptRequestParams { arguments, name } = params;
        let Some(entry) = self.server.prompts.get(&name) else {
            return error_message(
                id,
                INVALID_PARAMS_ERROR_CODE,
                format!("unknown prompt '{name}'"),
                None,
            );
        };
        let arguments = arguments.unwrap_or_default();
        let messages = entry.template.render(&arguments);
        response_message(
            id,
            GetPromptResult {
                description: entry.prompt.description.clone(),
                messages,
            },
        )
    }

    async fn handle_read_resource(
        &self,
        id: RequestId,
        params: ReadResourceRequestParams,
    ) -> JSONRPCMessage {
        info!("resources/read -> params: {params:?}");
        let ReadResourceRequestParams { uri } = params;
        let Some(entry) = self.server.resources.get(&uri) else {
            return error_message(
                id,
                INVALID_PARAMS_ERROR_CODE,
                format!("unknown resource '{uri}'"),
                None,
            );
        };
        let contents = entry.producer.read(&uri).await;
        response_message(id, ReadResourceResult { contents })
    }

    fn handle_subscribe(&self, id: RequestId, params: SubscribeRequestParams) -> JSONRPCMessage {
        info!("resources/subscribe -> params: {params:?}");
        let SubscribeRequestParams { uri } = params;
        if self.server.resources.get(&uri).is_none() {
            return error_message(
                id,
                INVALID_PARAMS_ERROR_CODE,
                format!("unknown resource '{uri}'"),
                None,
            );
        }
        self.handle.subscribe_uri(&uri);
        response_message(id, json!({}))
    }

    fn handle_unsubscribe(
        &self,
        id: RequestId,
        params: UnsubscribeRequestParams,
    ) -> JSONRPCMessage {
        info!("resources/unsubscribe -> params: {params:?}");
        self.handle.unsubscribe_uri(&params.uri);
        response_message(id, json!({}))
    }

    fn handle_set_level(&self, id: RequestId, params: SetLevelRequestParams) -> JSONRPCMessage {
        info!("logging/setLevel -> params: {params:?}");
        self.handle.set_min_log_level(params.level);
        response_message(id, json!({}))
    }

    /// Handle a fire-and-forget JSON-RPC notification.
    pub(crate) async fn process_notification(&self, notification: JSONRPCNotification) {
        let client_notification = match ClientNotification::try_from(notification) {
            Ok(n) => n,
            Err(e) => {
                warn!("failed to convert notification: {e}");
                return;
            }
        };

        match client_notification {
            ClientNotification::InitializedNotification(_) => {
                if self.handle.phase() == SessionPhase::Initializing {
                    self.handle.set_phase(SessionPhase::Ready);
                    info!("session ready");
                } else {
                    warn!("notifications/initialized outside the handshake");
                }
            }
            // Advisory: remote work is not interrupted on its account.
            ClientNotification::CancelledNotification(params) => {
                debug!("client cancelled request {}: {:?}", params.request_id, params.reason);
            }
        }
    }

    /// Handle a standalone JSON-RPC response originating from the peer.
    pub(crate) async fn process_response(&self, response: JSONRPCResponse) {
        info!("<- response: {response:?}");
        let JSONRPCResponse { id, result, .. } = response;
        self.handle.outgoing.notify_client_response(&id, result).await;
    }

    /// Handle an error object received from the peer.
    pub(crate) async fn process_error(&self, err: JSONRPCError) {
        info!("<- error: {err:?}");
        let JSONRPCError { id, error, .. } = err;
        self.handle.outgoing.notify_client_error(&id, error).await;
    }

    /// Answer an undecodable frame: bad JSON maps to `-32700`, a JSON value
    /// that is not a message maps to `-32600`. The connection stays open.
    pub(crate) async fn report_codec_error(&self, err: CodecError) {
        let value = match err {
            CodecError::Malformed(e) => {
                error_response_value(None, PARSE_ERROR_CODE, &format!("Parse error: {e}"))
            }
            CodecError::InvalidShape { id } => {
                error_response_value(id.as_ref(), INVALID_REQUEST_ERROR_CODE, "Invalid Request")
            }
            CodecError::Encode(e) => {
                warn!("unexpected encode error on the inbound path: {e}");
                return;
            }
        };
        self.handle.outgoing.send_raw(value).await;
    }

    /// The peer is gone: fail callbacks and park the session.
    pub(crate) async fn on_disconnect(&self) {
        self.handle.outgoing.fail_pending().await;
        let next = match self.handle.phase() {
            SessionPhase::Failed => SessionPhase::Failed,
            _ => SessionPhase::Closed,
        };
        self.handle.set_phase(next);
    }
}

/// What this server advertises. Options beyond these (completions,
/// experimental) are not part of the core.
fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        completions: None,
        experimental: None,
        logging: Some(json!({})),
        prompts: Some(ServerCapabilitiesPrompts {
            list_changed: Some(true),
        }),
        resources: Some(ServerCapabilitiesResources {
            list_changed: Some(true),
            subscribe: Some(true),
        }),
        tools: Some(ServerCapabilitiesTools {
            list_changed: Some(true),
        }),
    }
}
