//! The resource registry.
//!
//! Resources are URI-unique. Reading goes through a content producer so the
//! registry never holds the bytes itself; updating a resource swaps the
//! producer and lets the server fan `notifications/resources/updated` out to
//! the sessions subscribed to that URI.

use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use conduit_mcp_types::Resource;
use conduit_mcp_types::ResourceContents;
use conduit_mcp_types::TextResourceContents;

#[async_trait]
pub trait ResourceProducer: Send + Sync {
    async fn read(&self, uri: &str) -> Vec<ResourceContents>;
}

/// Fixed text contents; enough for most static resources.
pub struct StaticText(pub String);

#[async_trait]
impl ResourceProducer for StaticText {
    async fn read(&self, uri: &str) -> Vec<ResourceContents> {
        vec![ResourceContents::Text(TextResourceContents {
            mime_type: Some("text/plain".to_string()),
            text: self.0.clone(),
            uri: uri.to_string(),
        })]
    }
}

#[derive(Clone)]
pub(crate) struct ResourceEntry {
    pub resource: Resource,
    pub producer: Arc<dyn ResourceProducer>,
}

#[derive(Default)]
pub(crate) struct ResourceRegistry {
    entries: RwLock<Arc<Vec<ResourceEntry>>>,
}

impl ResourceRegistry {
    fn snapshot(&self) -> Arc<Vec<ResourceEntry>> {
        self.entries
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn get(&self, uri: &str) -> Option<ResourceEntry> {
        self.snapshot()
            .iter()
            .find(|e| e.resource.uri == uri)
            .cloned()
    }

    pub(crate) fn insert(&self, resource: Resource, producer: Arc<dyn ResourceProducer>) -> bool {
        let Ok(mut guard) = self.entries.write() else {
            return false;
        };
        if guard.iter().any(|e| e.resource.uri == resource.uri) {
            return false;
        }
        let mut next = guard.as_ref().clone();
        next.push(ResourceEntry { resource, producer });
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn remove(&self, uri: &str) -> bool {
        let Ok(mut guard) = self.entries.write() else {
            return false;
        };
        if !guard.iter().any(|e| e.resource.uri == uri) {
            return false;
        }
        let next: Vec<ResourceEntry> = guard
            .iter()
            .filter(|e| e.resource.uri != uri)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    /// Swap the producer for an existing URI. Returns false for unknown
    /// URIs; the caller decides whether that is an error.
    pub(crate) fn replace_producer(&self, uri: &str, producer: Arc<dyn ResourceProducer>) -> bool {
        let Ok(mut guard) = self.entries.write() else {
            return false;
        };
        let mut next = guard.as_ref().clone();
        let Some(entry) = next.iter_mut().find(|e| e.resource.uri == uri) else {
            return false;
        };
        entry.producer = producer;
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn list(&self) -> Vec<Resource> {
        self.snapshot().iter().map(|e| e.resource.clone()).collect()
    }
}
