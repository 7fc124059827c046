//! The prompt registry.
//!
//! A prompt pairs its descriptor with a message template. Substitution is
//! permissive: arguments the caller did not provide leave their
//! `{placeholder}` holes verbatim rather than failing the request.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use conduit_mcp_types::ContentBlock;
use conduit_mcp_types::Prompt;
use conduit_mcp_types::PromptMessage;
use conduit_mcp_types::Role;

pub trait PromptTemplate: Send + Sync {
    fn render(&self, arguments: &HashMap<String, String>) -> Vec<PromptMessage>;
}

/// One-message text template with `{name}` substitution.
pub struct TextPromptTemplate {
    pub role: Role,
    pub text: String,
}

impl PromptTemplate for TextPromptTemplate {
    fn render(&self, arguments: &HashMap<String, String>) -> Vec<PromptMessage> {
        let mut text = self.text.clone();
        for (name, value) in arguments {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        vec![PromptMessage {
            content: ContentBlock::text(text),
            role: self.role,
        }]
    }
}

#[derive(Clone)]
pub(crate) struct PromptEntry {
    pub prompt: Prompt,
    pub template: Arc<dyn PromptTemplate>,
}

#[derive(Default)]
pub(crate) struct PromptRegistry {
    entries: RwLock<Arc<Vec<PromptEntry>>>,
}

impl PromptRegistry {
    fn snapshot(&self) -> Arc<Vec<PromptEntry>> {
        self.entries
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub(crate) fn get(&self, name: &str) -> Option<PromptEntry> {
        self.snapshot()
            .iter()
            .find(|e| e.prompt.name == name)
            .cloned()
    }

    pub(crate) fn insert(&self, prompt: Prompt, template: Arc<dyn PromptTemplate>) -> bool {
        let Ok(mut guard) = self.entries.write() else {
            return false;
        };
        if guard.iter().any(|e| e.prompt.name == prompt.name) {
            return false;
        }
        let mut next = guard.as_ref().clone();
        next.push(PromptEntry { prompt, template });
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn remove(&self, name: &str) -> bool {
        let Ok(mut guard) = self.entries.write() else {
            return false;
        };
        if !guard.iter().any(|e| e.prompt.name == name) {
            return false;
        }
        let next: Vec<PromptEntry> = guard
            .iter()
            .filter(|e| e.prompt.name != name)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn list(&self) -> Vec<Prompt> {
        self.snapshot().iter().map(|e| e.prompt.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_mcp_types::TextContent;
    use pretty_assertions::assert_eq;

    #[test]
    fn substitutes_provided_arguments() {
        let template = TextPromptTemplate {
            role: Role::User,
            text: "Review {file} for {concern}".to_string(),
        };
        let args = HashMap::from([
            ("file".to_string(), "main.rs".to_string()),
            ("concern".to_string(), "races".to_string()),
        ]);
        let messages = template.render(&args);
        let ContentBlock::TextContent(TextContent { text, .. }) = &messages[0].content else {
            panic!("expected text content");
        };
        assert_eq!(text, "Review main.rs for races");
    }

    #[test]
    fn missing_arguments_leave_the_placeholder_verbatim() {
        let template = TextPromptTemplate {
            role: Role::User,
            text: "Review {file}".to_string(),
        };
        let messages = template.render(&HashMap::new());
        let ContentBlock::TextContent(TextContent { text, .. }) = &messages[0].content else {
            panic!("expected text content");
        };
        assert_eq!(text, "Review {file}");
    }
}
