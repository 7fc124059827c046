//! Shared server state and per-session bookkeeping.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::Weak;

use conduit_mcp_types::ClientCapabilities;
use conduit_mcp_types::Implementation;
use conduit_mcp_types::LoggingLevel;
use conduit_mcp_types::LoggingMessageNotification;
use conduit_mcp_types::LoggingMessageNotificationParams;
use conduit_mcp_types::ModelContextProtocolNotification;
use conduit_mcp_types::Prompt;
use conduit_mcp_types::PromptListChangedNotification;
use conduit_mcp_types::ProtocolVersion;
use conduit_mcp_types::Resource;
use conduit_mcp_types::ResourceListChangedNotification;
use conduit_mcp_types::ResourceUpdatedNotification;
use conduit_mcp_types::ResourceUpdatedNotificationParams;
use conduit_mcp_types::Tool;
use conduit_mcp_types::ToolListChangedNotification;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::outgoing_message::OutgoingMessageSender;
use crate::outgoing_message::OutgoingNotification;
use crate::prompts::PromptRegistry;
use crate::prompts::PromptTemplate;
use crate::resources::ResourceProducer;
use crate::resources::ResourceRegistry;
use crate::tools::ToolHandler;
use crate::tools::ToolRegistry;

/// Server identity and fixed handshake payload pieces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    #[serde(default = "default_server_info")]
    pub server_info: Implementation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_info: default_server_info(),
            instructions: None,
        }
    }
}

fn default_server_info() -> Implementation {
    Implementation {
        name: "conduit-mcp-server".to_string(),
        title: Some("Conduit".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionPhase {
    Created,
    Initializing,
    Ready,
    Closed,
    Failed,
}

/// What the handshake pinned down for one session.
pub(crate) struct Negotiated {
    pub version: ProtocolVersion,
    #[allow(dead_code)]
    pub client_info: Implementation,
    #[allow(dead_code)]
    pub client_capabilities: ClientCapabilities,
}

/// Per-session mutable state, shared between the message processor and the
/// server-wide broadcast paths.
pub(crate) struct SessionHandle {
    pub outgoing: Arc<OutgoingMessageSender>,
    phase: Mutex<SessionPhase>,
    negotiated: OnceLock<Negotiated>,
    subscribed_uris: Mutex<HashSet<String>>,
    /// Threshold for `notifications/message`. Everything passes until the
    /// client calls `logging/setLevel`.
    min_log_level: Mutex<LoggingLevel>,
}

impl SessionHandle {
    pub(crate) fn new(outgoing: Arc<OutgoingMessageSender>) -> Self {
        Self {
            outgoing,
            phase: Mutex::new(SessionPhase::Created),
            negotiated: OnceLock::new(),
            subscribed_uris: Mutex::new(HashSet::new()),
            min_log_level: Mutex::new(LoggingLevel::Debug),
        }
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
            .lock()
            .map(|guard| *guard)
            .unwrap_or(SessionPhase::Failed)
    }

    pub(crate) fn set_phase(&self, next: SessionPhase) {
        if let Ok(mut guard) = self.phase.lock() {
            *guard = next;
        }
    }

    /// Record the handshake outcome. The values are immutable afterwards.
    pub(crate) fn set_negotiated(&self, negotiated: Negotiated) {
        let _ = self.negotiated.set(negotiated);
    }

    pub(crate) fn negotiated_version(&self) -> Option<ProtocolVersion> {
        self.negotiated.get().map(|n| n.version)
    }

    /// Whether list-changed notifications were negotiated. The flattened
    /// pre-2025-06-18 capability shape cannot carry the option, so only
    /// nested-shape sessions receive them.
    pub(crate) fn wants_list_changed(&self) -> bool {
        self.negotiated_version()
            .is_some_and(|v| conduit_mcp_types::shape::adapter(v).nested_capabilities)
    }

    pub(crate) fn subscribe_uri(&self, uri: &str) {
        if let Ok(mut guard) = self.subscribed_uris.lock() {
            guard.insert(uri.to_string());
        }
    }

    pub(crate) fn unsubscribe_uri(&self, uri: &str) {
        if let Ok(mut guard) = self.subscribed_uris.lock() {
            guard.remove(uri);
        }
    }

    pub(crate) fn is_subscribed(&self, uri: &str) -> bool {
        self.subscribed_uris
            .lock()
            .map(|guard| guard.contains(uri))
            .unwrap_or(false)
    }

    pub(crate) fn set_min_log_level(&self, level: LoggingLevel) {
        if let Ok(mut guard) = self.min_log_level.lock() {
            *guard = level;
        }
    }

    pub(crate) fn min_log_level(&self) -> LoggingLevel {
        self.min_log_level
            .lock()
            .map(|guard| *guard)
            .unwrap_or(LoggingLevel::Debug)
    }
}

/// An MCP server: registries plus the set of live sessions.
///
/// One `McpServer` can back any number of concurrent sessions (one per
/// transport connection); registries are shared, session state is not.
pub struct McpServer {
    pub(crate) config: ServerConfig,
    pub(crate) tools: ToolRegistry,
    pub(crate) prompts: PromptRegistry,
    pub(crate) resources: ResourceRegistry,
    sessions: Mutex<Vec<Weak<SessionHandle>>>,
}

impl McpServer {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            tools: ToolRegistry::default(),
            prompts: PromptRegistry::default(),
            resources: ResourceRegistry::default(),
            sessions: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn attach_session(&self, handle: &Arc<SessionHandle>) {
        if let Ok(mut guard) = self.sessions.lock() {
            guard.retain(|weak| weak.strong_count() > 0);
            guard.push(Arc::downgrade(handle));
        }
    }

    fn live_sessions(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions
            .lock()
            .map(|guard| guard.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    async fn broadcast_list_changed(&self, method: &'static str) {
        for session in self.live_sessions() {
            if session.phase() != SessionPhase::Ready || !session.wants_list_changed() {
                continue;
            }
            session
                .outgoing
                .send_notification(OutgoingNotification {
                    method: method.to_string(),
                    params: None,
                })
                .await;
        }
    }

    /// Register a tool. Returns false (and changes nothing) when the name is
    /// taken.
    pub async fn add_tool(&self, tool: Tool, handler: Arc<dyn ToolHandler>) -> bool {
        let inserted = self.tools.insert(tool, handler);
        if inserted {
            self.broadcast_list_changed(ToolListChangedNotification::METHOD)
                .await;
        }
        inserted
    }

    pub async fn remove_tool(&self, name: &str) -> bool {
        let removed = self.tools.remove(name);
        if removed {
            self.broadcast_list_changed(ToolListChangedNotification::METHOD)
                .await;
        }
        removed
    }

    pub async fn add_prompt(&self, prompt: Prompt, template: Arc<dyn PromptTemplate>) -> bool {
        let inserted = self.prompts.insert(prompt, template);
        if inserted {
            self.broadcast_list_changed(PromptListChangedNotification::METHOD)
                .await;
        }
        inserted
    }

    pub async fn remove_prompt(&self, name: &str) -> bool {
        let removed = self.prompts.remove(name);
        if removed {
            self.broadcast_list_changed(PromptListChangedNotification::METHOD)
                .await;
        }
        removed
    }

    pub async fn add_resource(
        &self,
        resource: Resource,
        producer: Arc<dyn ResourceProducer>,
    ) -> bool {
        let inserted = self.resources.insert(resource, producer);
        if inserted {
            self.broadcast_list_changed(ResourceListChangedNotification::METHOD)
                .await;
        }
        inserted
    }

    pub async fn remove_resource(&self, uri: &str) -> bool {
        let removed = self.resources.remove(uri);
        if removed {
            self.broadcast_list_changed(ResourceListChangedNotification::METHOD)
                .await;
        }
        removed
    }

    /// Swap a resource's contents and notify exactly the sessions subscribed
    /// to its URI, in registration order.
    pub async fn update_resource(&self, uri: &str, producer: Arc<dyn ResourceProducer>) -> bool {
        if !self.resources.replace_producer(uri, producer) {
            return false;
        }
        let params = ResourceUpdatedNotificationParams {
            uri: uri.to_string(),
        };
        for session in self.live_sessions() {
            if session.phase() != SessionPhase::Ready || !session.is_subscribed(uri) {
                continue;
            }
            let params = match serde_json::to_value(&params) {
                Ok(params) => Some(params),
                Err(_) => None,
            };
            session
                .outgoing
                .send_notification(OutgoingNotification {
                    method: ResourceUpdatedNotification::METHOD.to_string(),
                    params,
                })
                .await;
        }
        true
    }

    /// Emit `notifications/message` to every ready session whose threshold
    /// admits `level`. Filtering happens here, before anything is queued.
    pub async fn log_message(
        &self,
        level: LoggingLevel,
        logger: Option<String>,
        data: serde_json::Value,
    ) {
        let params = LoggingMessageNotificationParams {
            data,
            level,
            logger,
        };
        for session in self.live_sessions() {
            if session.phase() != SessionPhase::Ready || level < session.min_log_level() {
                continue;
            }
            let params = match serde_json::to_value(&params) {
                Ok(params) => Some(params),
                Err(_) => None,
            };
            session
                .outgoing
                .send_notification(OutgoingNotification {
                    method: LoggingMessageNotification::METHOD.to_string(),
                    params,
                })
                .await;
        }
        debug!("log message fanned out at {level:?}");
    }
}
