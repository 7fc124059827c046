//! Server→client message plumbing.
//!
//! Every session has one [`OutgoingMessageSender`]: handlers enqueue
//! messages here and a single writer task (stdio line writer, SSE broadcast,
//! or in-memory queue) drains them, which is what keeps the outbound
//! direction FIFO. Server-initiated requests go through the same pending
//! table machinery the client uses.

use conduit_mcp_types::JSONRPC_VERSION;
use conduit_mcp_types::JSONRPCError;
use conduit_mcp_types::JSONRPCErrorError;
use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::JSONRPCNotification;
use conduit_mcp_types::JSONRPCRequest;
use conduit_mcp_types::JSONRPCResponse;
use conduit_mcp_types::RequestId;
use conduit_rpc::PendingReceiver;
use conduit_rpc::RequestRouter;
use conduit_rpc::error_code::INTERNAL_ERROR_CODE;
use serde::Serialize;
use tokio::sync::mpsc;

/// Sends messages to the client and correlates callbacks for
/// server-initiated requests.
pub(crate) struct OutgoingMessageSender {
    router: RequestRouter,
    sender: mpsc::UnboundedSender<OutgoingMessage>,
}

impl OutgoingMessageSender {
    pub(crate) fn new(sender: mpsc::UnboundedSender<OutgoingMessage>) -> Self {
        Self {
            router: RequestRouter::new(),
            sender,
        }
    }

    /// Issue a server→client request. The returned receiver completes when
    /// the client responds.
    pub(crate) async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> PendingReceiver {
        let (id, rx) = self.router.register().await;
        let outgoing_message = OutgoingMessage::Request(OutgoingRequest {
            id,
            method: method.to_string(),
            params,
        });
        let _ = self.sender.send(outgoing_message);
        rx
    }

    /// Route a client response to the callback registered for its id.
    pub(crate) async fn notify_client_response(&self, id: &RequestId, result: serde_json::Value) {
        self.router.complete_ok(id, result).await;
    }

    pub(crate) async fn notify_client_error(&self, id: &RequestId, error: JSONRPCErrorError) {
        self.router.complete_err(id, error).await;
    }

    pub(crate) async fn send_response<T: Serialize>(&self, id: RequestId, response: T) {
        match serde_json::to_value(response) {
            Ok(result) => {
                let outgoing_message = OutgoingMessage::Response(OutgoingResponse { id, result });
                let _ = self.sender.send(outgoing_message);
            }
            Err(err) => {
                self.send_error(
                    id,
                    JSONRPCErrorError {
                        code: INTERNAL_ERROR_CODE,
                        message: format!("failed to serialize response: {err}"),
                        data: None,
                    },
                )
                .await;
            }
        }
    }

    pub(crate) async fn send_notification(&self, notification: OutgoingNotification) {
        let outgoing_message = OutgoingMessage::Notification(notification);
        let _ = self.sender.send(outgoing_message);
    }

    pub(crate) async fn send_error(&self, id: RequestId, error: JSONRPCErrorError) {
        let outgoing_message = OutgoingMessage::Error(OutgoingError { id, error });
        let _ = self.sender.send(outgoing_message);
    }

    /// Emit a pre-rendered JSON value. Used for the replies that have no
    /// typed id (null-id errors) and for aggregated batch responses.
    pub(crate) async fn send_raw(&self, value: serde_json::Value) {
        let _ = self.sender.send(OutgoingMessage::Raw(value));
    }

    /// Fail the callbacks of all in-flight server→client requests.
    pub(crate) async fn fail_pending(&self) {
        self.router.fail_all().await;
    }
}

/// Outgoing message from the server to the client.
pub(crate) enum OutgoingMessage {
    Request(OutgoingRequest),
    Notification(OutgoingNotification),
    Response(OutgoingResponse),
    Error(OutgoingError),
    /// Already rendered to its wire form.
    Raw(serde_json::Value),
}

impl OutgoingMessage {
    /// Wire form of this message. Serialization of the structured variants
    /// cannot fail; the fallback keeps the writer loop panic-free.
    pub(crate) fn into_wire_value(self) -> serde_json::Value {
        use OutgoingMessage::*;
        let message = match self {
            Raw(value) => return value,
            Request(OutgoingRequest { id, method, params }) => {
                JSONRPCMessage::Request(JSONRPCRequest {
                    jsonrpc: JSONRPC_VERSION.into(),
                    id,
                    method,
                    params,
                })
            }
            Notification(OutgoingNotification { method, params }) => {
                JSONRPCMessage::Notification(JSONRPCNotification {
                    jsonrpc: JSONRPC_VERSION.into(),
                    method,
                    params,
                })
            }
            Response(OutgoingResponse { id, result }) => {
                JSONRPCMessage::Response(JSONRPCResponse {
                    jsonrpc: JSONRPC_VERSION.into(),
                    id,
                    result,
                })
            }
            Error(OutgoingError { id, error }) => JSONRPCMessage::Error(JSONRPCError {
                jsonrpc: JSONRPC_VERSION.into(),
                id,
                error,
            }),
        };
        serde_json::to_value(message).unwrap_or(serde_json::Value::Null)
    }

    /// A structured [`JSONRPCMessage`], where this message is one.
    pub(crate) fn into_message(self) -> Option<JSONRPCMessage> {
        match self {
            OutgoingMessage::Raw(_) => None,
            other => serde_json::from_value(other.into_wire_value()).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OutgoingRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OutgoingNotification {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OutgoingResponse {
    pub id: RequestId,
    pub result: conduit_mcp_types::Result,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OutgoingError {
    pub error: JSONRPCErrorError,
    pub id: RequestId,
}
