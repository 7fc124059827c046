//! JSON-RPC 2.0 engine: framing codec, error taxonomy, and the pending
//! request table that pairs outbound requests with their responses.
//!
//! Nothing in this crate knows MCP methods; the session crates layer the
//! protocol lifecycle on top.

mod codec;
pub mod error_code;
mod router;

pub use codec::BatchEntry;
pub use codec::CodecError;
pub use codec::IncomingPayload;
pub use codec::decode_message;
pub use codec::encode_message;
pub use codec::error_response_value;
pub use router::PendingReceiver;
pub use router::RequestRouter;

use conduit_mcp_types::JSONRPCErrorError;

/// What a local caller sees when a request does not produce a result.
///
/// Only [`RpcError::Peer`] ever came over the wire; every other variant is a
/// local condition and never leaves the process.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("transport closed")]
    TransportClosed,

    #[error("transport unavailable: {0}")]
    Transport(String),

    #[error("session is not ready")]
    NotReady,

    #[error("session is closed")]
    Closed,

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("peer returned JSON-RPC error: code = {}, message = {}", .0.code, .0.message)]
    Peer(JSONRPCErrorError),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
