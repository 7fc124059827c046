//! An async MCP client.
//!
//! [`McpClient`] binds the JSON-RPC engine to any transport and drives the
//! MCP lifecycle on top: the initialize handshake with version negotiation,
//! a ready gate in front of application traffic, typed request helpers, and
//! ordered delivery of server-initiated notifications to subscribers.

mod config;
mod mcp_client;

pub use config::ClientConfig;
pub use mcp_client::McpClient;
pub use mcp_client::SessionState;
