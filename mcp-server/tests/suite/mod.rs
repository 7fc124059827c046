use std::sync::Arc;

use conduit_mcp_client::ClientConfig;
use conduit_mcp_client::McpClient;
use conduit_mcp_server::FnToolHandler;
use conduit_mcp_server::McpServer;
use conduit_mcp_server::ServerConfig;
use conduit_mcp_server::StaticText;
use conduit_mcp_server::TextPromptTemplate;
use conduit_mcp_server::ToolError;
use conduit_mcp_server::ToolOutput;
use conduit_mcp_server::serve_in_memory;
use conduit_mcp_types::ContentBlock;
use conduit_mcp_types::Prompt;
use conduit_mcp_types::PromptArgument;
use conduit_mcp_types::Resource;
use conduit_mcp_types::Role;
use conduit_mcp_types::Tool;
use conduit_mcp_types::ToolInputSchema;
use serde_json::json;

mod http;
mod initialize;
mod logging;
mod prompts;
mod resources;
mod stdio;
mod tools;

fn object_schema() -> ToolInputSchema {
    ToolInputSchema {
        properties: None,
        required: None,
        r#type: "object".to_string(),
    }
}

/// A server with one of everything: an `add` tool (structured output), a
/// `boom` tool that always fails, a `greet` prompt, and a `test://x`
/// resource.
pub(crate) async fn test_server() -> Arc<McpServer> {
    let server = McpServer::new(ServerConfig {
        instructions: Some("test fixture".to_string()),
        ..ServerConfig::default()
    });

    server
        .add_tool(
            Tool {
                annotations: None,
                description: Some("Add two integers".to_string()),
                input_schema: object_schema(),
                name: "add".to_string(),
                output_schema: None,
                title: None,
            },
            Arc::new(FnToolHandler(|arguments: Option<serde_json::Value>| async move {
                let int_arg = |name: &str| {
                    arguments
                        .as_ref()
                        .and_then(|a| a.get(name))
                        .and_then(|v| v.as_i64())
                        .ok_or_else(|| ToolError::new(format!("missing integer argument `{name}`")))
                };
                let sum = int_arg("a")? + int_arg("b")?;
                Ok(ToolOutput {
                    content: vec![ContentBlock::text(sum.to_string())],
                    structured_content: Some(json!({"sum": sum})),
                })
            })),
        )
        .await;

    server
        .add_tool(
            Tool {
                annotations: None,
                description: Some("Always fails".to_string()),
                input_schema: object_schema(),
                name: "boom".to_string(),
                output_schema: None,
                title: None,
            },
            Arc::new(FnToolHandler(|_arguments: Option<serde_json::Value>| async move {
                Err::<ToolOutput, _>(ToolError::new("boom"))
            })),
        )
        .await;

    server
        .add_prompt(
            Prompt {
                arguments: Some(vec![PromptArgument {
                    description: None,
                    name: "subject".to_string(),
                    required: Some(true),
                }]),
                description: Some("A friendly greeting".to_string()),
                name: "greet".to_string(),
                title: None,
            },
            Arc::new(TextPromptTemplate {
                role: Role::User,
                text: "Say hello to {subject}.".to_string(),
            }),
        )
        .await;

    server
        .add_resource(
            Resource {
                description: None,
                mime_type: Some("text/plain".to_string()),
                name: "x".to_string(),
                title: None,
                uri: "test://x".to_string(),
            },
            Arc::new(StaticText("one".to_string())),
        )
        .await;

    server
}

/// In-memory client for `server`, already past the handshake.
pub(crate) async fn ready_client(server: Arc<McpServer>, proposal: &str) -> McpClient {
    let transport = serve_in_memory(server);
    let config = ClientConfig {
        protocol_version: proposal.to_string(),
        ..ClientConfig::default()
    };
    let client = McpClient::new_in_memory_client(transport, config);
    client.initialize().await.expect("handshake must succeed");
    client
}
