//! Transport layer: the framing and I/O under a session.
//!
//! A transport moves framed JSON-RPC messages and nothing else — it has no
//! idea what an MCP method is. Three shapes are provided: a subprocess
//! speaking one JSON value per line over stdio, a streamable-HTTP client,
//! and an in-process loopback pair. All of them guarantee at-most-once
//! delivery, FIFO per direction, and an idempotent `close`.

use async_trait::async_trait;
use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::ProtocolVersion;
use conduit_rpc::CodecError;
use conduit_rpc::RpcError;

mod http;
mod memory;
mod registry;
mod stdio;

pub use http::HttpTransport;
pub use memory::InMemoryTransport;
pub use registry::HttpConfig;
pub use registry::StdioConfig;
pub use registry::TransportConfig;
pub use registry::TransportKind;
pub use registry::TransportRegistry;
pub use stdio::StdioTransport;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to spawn server process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport closed")]
    Closed,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid transport configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<TransportError> for RpcError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => RpcError::TransportClosed,
            other => RpcError::Transport(other.to_string()),
        }
    }
}

/// One inbound event from a transport's read side.
#[derive(Debug)]
pub enum TransportEvent {
    Message(JSONRPCMessage),
    /// A decoded JSON array frame. Batch framing is preserved so the
    /// receiving engine can aggregate the batch response in order.
    Batch(Vec<conduit_rpc::BatchEntry>),
    /// Bytes arrived but did not decode. The connection stays open; the
    /// engine answers `-32700`/`-32600` as appropriate.
    Malformed(CodecError),
    /// The peer is gone. Terminal: no further events follow.
    Closed,
}

/// Capability set every transport implements.
///
/// `recv` is the single push source of inbound events; the session owns the
/// one reader loop per transport. `close` is idempotent and `is_alive` flips
/// to false before it returns.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Queue one framed message for delivery. Completion means the transport
    /// accepted the bytes, not that the peer acted on them.
    async fn send(&self, msg: JSONRPCMessage) -> Result<(), TransportError>;

    /// Next inbound event, or `None` after `Closed` has been delivered.
    async fn recv(&self) -> Option<TransportEvent>;

    async fn close(&self) -> Result<(), TransportError>;

    fn is_alive(&self) -> bool;

    /// Session identifier, where the transport has one (HTTP after the
    /// initialize response, synthetic for in-memory, none for stdio).
    fn session_id(&self) -> Option<String>;

    /// Hook for the session to announce the negotiated protocol revision.
    /// Only the HTTP transport cares (the `MCP-Protocol-Version` header).
    fn set_protocol_version(&self, _version: ProtocolVersion) {}
}
