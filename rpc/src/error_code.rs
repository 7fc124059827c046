//! JSON-RPC 2.0 wire error codes. Application errors use the reserved
//! `-32000..-32099` band; MCP-specific errors use positive codes in the
//! payload and never collide with these.

pub const PARSE_ERROR_CODE: i64 = -32700;
pub const INVALID_REQUEST_ERROR_CODE: i64 = -32600;
pub const METHOD_NOT_FOUND_ERROR_CODE: i64 = -32601;
pub const INVALID_PARAMS_ERROR_CODE: i64 = -32602;
pub const INTERNAL_ERROR_CODE: i64 = -32603;
