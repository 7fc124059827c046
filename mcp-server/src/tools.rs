//! The tool registry.
//!
//! Registered tools are name-unique per server. The registry is
//! copy-on-write: mutation clones the current snapshot, publishes the new
//! one, and only then does the caller fire `notifications/tools/list_changed`
//! — readers never observe a half-applied change.

use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use conduit_mcp_types::ContentBlock;
use conduit_mcp_types::Tool;
use serde_json::Value;

/// What a tool produces on success. Shaping to the negotiated revision
/// (structured content, audio parts) happens at the session boundary, not
/// here.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    pub structured_content: Option<Value>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            structured_content: None,
        }
    }
}

/// A tool failure. Reported to the caller as `{isError: true}` content, never
/// as a JSON-RPC error.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Option<Value>) -> Result<ToolOutput, ToolError>;
}

#[derive(Clone)]
pub(crate) struct ToolEntry {
    pub tool: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
pub(crate) struct ToolRegistry {
    entries: RwLock<Arc<Vec<ToolEntry>>>,
}

impl ToolRegistry {
    pub(crate) fn snapshot(&self) -> Arc<Vec<ToolEntry>> {
        self.entries
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn get(&self, name: &str) -> Option<ToolEntry> {
        self.snapshot().iter().find(|e| e.tool.name == name).cloned()
    }

    /// Returns false when a tool with the same name already exists.
    pub(crate) fn insert(&self, tool: Tool, handler: Arc<dyn ToolHandler>) -> bool {
        let Ok(mut guard) = self.entries.write() else {
            return false;
        };
        if guard.iter().any(|e| e.tool.name == tool.name) {
            return false;
        }
        let mut next = guard.as_ref().clone();
        next.push(ToolEntry { tool, handler });
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn remove(&self, name: &str) -> bool {
        let Ok(mut guard) = self.entries.write() else {
            return false;
        };
        if !guard.iter().any(|e| e.tool.name == name) {
            return false;
        }
        let next: Vec<ToolEntry> = guard
            .iter()
            .filter(|e| e.tool.name != name)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn list(&self) -> Vec<Tool> {
        self.snapshot().iter().map(|e| e.tool.clone()).collect()
    }
}

/// A [`ToolHandler`] built from an async closure, for tools that do not
/// warrant a dedicated type.
pub struct FnToolHandler<F>(pub F);

#[async_trait]
impl<F, Fut> ToolHandler for FnToolHandler<F>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<ToolOutput, ToolError>> + Send,
{
    async fn call(&self, arguments: Option<Value>) -> Result<ToolOutput, ToolError> {
        (self.0)(arguments).await
    }
}
