//! Wire types for the Model Context Protocol (MCP).
//!
//! The crate has two layers:
//!   1. The JSON-RPC 2.0 envelope ([`JSONRPCMessage`] and friends), shared by
//!      every transport.
//!   2. The typed MCP payloads (tools, prompts, resources, logging,
//!      capabilities) together with the [`ModelContextProtocolRequest`] /
//!      [`ModelContextProtocolNotification`] marker traits that pair a method
//!      name with its params and result types.
//!
//! Protocol-revision handling lives in [`version`] and [`shape`]; everything
//! else in the crate is revision-agnostic.

use serde::Deserialize;
use serde::Serialize;

mod protocol;
mod requests;
pub mod shape;
mod version;

pub use protocol::*;
pub use requests::*;
pub use version::ProtocolVersion;
pub use version::VersionParseError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Latest protocol revision this crate speaks. Clients propose it by default.
pub const MCP_SCHEMA_VERSION: &str = "2025-06-18";

/// A JSON-RPC `result` payload. Requests with no meaningful result use an
/// empty object.
pub type Result = serde_json::Value;

/// JSON-RPC request/response correlation id. Outbound ids are always
/// `Integer`; peers are free to send strings and we match them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Integer(i64),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Integer(i) => write!(f, "{i}"),
        }
    }
}

/// One decoded JSON-RPC message. The variant order matters: serde tries them
/// top to bottom, and a request (id + method) must win over a notification
/// (method only) because unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JSONRPCMessage {
    Request(JSONRPCRequest),
    Notification(JSONRPCNotification),
    Response(JSONRPCResponse),
    Error(JSONRPCError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Result,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JSONRPCErrorError,
}

/// The `error` member of a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCErrorError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Pairs an MCP request method name with its params and result types.
///
/// Implemented by uninhabited marker types (`InitializeRequest`, …) so that
/// callers can write `client.send_request::<ListToolsRequest>(params)` and
/// get a typed result back.
pub trait ModelContextProtocolRequest {
    const METHOD: &'static str;
    type Params: serde::de::DeserializeOwned + Serialize + Send + Sync;
    type Result: serde::de::DeserializeOwned + Serialize + Send + Sync;
}

/// Same pairing for notifications, which carry no result.
pub trait ModelContextProtocolNotification {
    const METHOD: &'static str;
    type Params: serde::de::DeserializeOwned + Serialize + Send + Sync;
}
