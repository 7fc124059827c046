//! Client-side session configuration.

use std::time::Duration;

use conduit_mcp_types::ClientCapabilities;
use conduit_mcp_types::Implementation;
use conduit_mcp_types::MCP_SCHEMA_VERSION;
use conduit_transport::TransportConfig;
use serde::Deserialize;
use serde::Serialize;

/// Everything a session recognizes, deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Highest protocol revision to propose during the handshake.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    #[serde(default = "default_client_info")]
    pub client_info: Implementation,

    #[serde(default)]
    pub capabilities: ClientCapabilities,

    /// Default deadline for outbound requests. `None` waits indefinitely.
    #[serde(
        default = "default_request_timeout",
        with = "option_duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout_sec: Option<Duration>,

    /// Transport selection; absent when the transport handle is constructed
    /// programmatically (in-memory pairs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            client_info: default_client_info(),
            capabilities: ClientCapabilities::default(),
            request_timeout_sec: default_request_timeout(),
            transport: None,
        }
    }
}

fn default_protocol_version() -> String {
    MCP_SCHEMA_VERSION.to_string()
}

fn default_client_info() -> Implementation {
    Implementation {
        name: "conduit-mcp-client".to_string(),
        title: Some("Conduit".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn default_request_timeout() -> Option<Duration> {
    Some(Duration::from_secs(60))
}

mod option_duration_secs {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
