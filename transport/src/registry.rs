//! Transport configuration and the factory registry.
//!
//! The registry is an ordinary value: construct it with `with_defaults()`
//! and pass it to whoever builds sessions. There is deliberately no
//! process-wide singleton.

use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde::Serialize;

use crate::HttpTransport;
use crate::StdioTransport;
use crate::Transport;
use crate::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Stdio,
    Http,
    InMemory,
}

/// Spawn instructions for a stdio MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdioConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
}

/// Endpoint description for a streamable-HTTP MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    pub base_url: String,

    /// Endpoint path on the server; everything goes through this one path.
    #[serde(default = "default_endpoint_path")]
    pub path: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Sent as a bearer token when present.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Accept invalid TLS certificates. Only for local development.
    #[serde(default)]
    pub allow_insecure: bool,
}

fn default_endpoint_path() -> String {
    "/mcp".to_string()
}

/// Transport selection as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransportConfig {
    Stdio(StdioConfig),
    Http(HttpConfig),
    /// In-memory transports are shared handles created with
    /// [`crate::InMemoryTransport::pair`]; they cannot be conjured from a
    /// config file.
    InMemory,
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportConfig::Stdio(_) => TransportKind::Stdio,
            TransportConfig::Http(_) => TransportKind::Http,
            TransportConfig::InMemory => TransportKind::InMemory,
        }
    }
}

type TransportFactory = Arc<
    dyn Fn(&TransportConfig) -> BoxFuture<'static, Result<Box<dyn Transport>, TransportError>>
        + Send
        + Sync,
>;

/// Maps a [`TransportKind`] to a factory producing connected transports.
pub struct TransportRegistry {
    factories: HashMap<TransportKind, TransportFactory>,
}

impl TransportRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in stdio and HTTP factories.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(TransportKind::Stdio, |config| {
            let TransportConfig::Stdio(stdio) = config else {
                return Box::pin(async {
                    Err(TransportError::Config("expected a stdio config".into()))
                });
            };
            let program: OsString = stdio.command.clone().into();
            let args: Vec<OsString> = stdio.args.iter().cloned().map(OsString::from).collect();
            let env = stdio.env.clone();
            Box::pin(async move {
                let transport = StdioTransport::spawn(program, args, env).await?;
                Ok(Box::new(transport) as Box<dyn Transport>)
            })
        });
        registry.register(TransportKind::Http, |config| {
            let TransportConfig::Http(http) = config else {
                return Box::pin(async {
                    Err(TransportError::Config("expected an http config".into()))
                });
            };
            let http = http.clone();
            Box::pin(async move {
                let transport = HttpTransport::new(&http)?;
                Ok(Box::new(transport) as Box<dyn Transport>)
            })
        });
        registry
    }

    pub fn register<F>(&mut self, kind: TransportKind, factory: F)
    where
        F: Fn(&TransportConfig) -> BoxFuture<'static, Result<Box<dyn Transport>, TransportError>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind, Arc::new(factory));
    }

    pub async fn connect(
        &self,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        match self.factories.get(&config.kind()) {
            Some(factory) => factory(config).await,
            None => Err(TransportError::Config(format!(
                "no factory registered for {:?} transports",
                config.kind()
            ))),
        }
    }
}
