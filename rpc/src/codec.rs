//! JSON text ↔ message conversion.
//!
//! The codec normalizes what the engine depends on: integral ids decode to
//! one width-irrelevant type ([`conduit_mcp_types::RequestId::Integer`] is always
//! `i64`), arrays decode eagerly into `Vec`s, and object keys are plain
//! strings. Encoding is compact JSON with no embedded newlines, which is
//! what makes one-message-per-line framing safe.

use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::RequestId;
use serde_json::Value;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The bytes were not JSON at all. Maps to wire `-32700`.
    #[error("malformed payload: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Valid JSON that is not a JSON-RPC message. Maps to wire `-32600`.
    /// Carries the `id` member when one was present so the error response
    /// can be addressed.
    #[error("invalid message shape")]
    InvalidShape { id: Option<RequestId> },

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One decoded inbound frame: a single message or a batch. Batch framing
/// stops here; nothing past the codec sees JSON arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingPayload {
    Single(JSONRPCMessage),
    Batch(Vec<BatchEntry>),
}

/// A batch element. Elements that are not valid messages are preserved (with
/// their `id`, when addressable) so the dispatcher can answer `-32600`
/// in-place instead of rejecting the whole batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEntry {
    Valid(JSONRPCMessage),
    Invalid { id: Option<RequestId> },
}

pub fn decode_message(raw: &str) -> Result<IncomingPayload, CodecError> {
    let value: Value = serde_json::from_str(raw).map_err(CodecError::Malformed)?;
    match value {
        Value::Array(entries) => Ok(IncomingPayload::Batch(
            entries.into_iter().map(decode_entry).collect(),
        )),
        other => decode_single(other).map(IncomingPayload::Single),
    }
}

fn request_id_of(value: &Value) -> Option<RequestId> {
    value
        .get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

fn decode_single(value: Value) -> Result<JSONRPCMessage, CodecError> {
    let id = request_id_of(&value);
    serde_json::from_value(value).map_err(|_| CodecError::InvalidShape { id })
}

fn decode_entry(value: Value) -> BatchEntry {
    let id = request_id_of(&value);
    match serde_json::from_value(value) {
        Ok(msg) => BatchEntry::Valid(msg),
        Err(_) => BatchEntry::Invalid { id },
    }
}

/// Compact, newline-free encoding of one message.
pub fn encode_message(msg: &JSONRPCMessage) -> Result<String, CodecError> {
    let encoded = serde_json::to_string(msg).map_err(CodecError::Encode)?;
    debug_assert!(
        !encoded.contains('\n'),
        "compact JSON must not contain raw newlines"
    );
    Ok(encoded)
}

/// A raw JSON-RPC error response for conditions where no typed [`RequestId`]
/// exists (parse errors, empty batches): the `id` member is `null` then.
pub fn error_response_value(id: Option<&RequestId>, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": conduit_mcp_types::JSONRPC_VERSION,
        "id": id,
        "error": { "code": code, "message": message },
    })
}
