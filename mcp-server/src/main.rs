use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use conduit_mcp_server::FnToolHandler;
use conduit_mcp_server::HttpServerConfig;
use conduit_mcp_server::McpServer;
use conduit_mcp_server::ServerConfig;
use conduit_mcp_server::StaticText;
use conduit_mcp_server::TextPromptTemplate;
use conduit_mcp_server::ToolError;
use conduit_mcp_server::ToolOutput;
use conduit_mcp_server::serve_http;
use conduit_mcp_server::serve_stdio;
use conduit_mcp_types::Prompt;
use conduit_mcp_types::PromptArgument;
use conduit_mcp_types::Resource;
use conduit_mcp_types::Role;
use conduit_mcp_types::Tool;
use conduit_mcp_types::ToolInputSchema;
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// MCP server speaking stdio by default, or streamable HTTP with `--bind`.
#[derive(Parser, Debug)]
#[command(name = "conduit-mcp-server")]
struct Cli {
    /// Serve over streamable HTTP on this address instead of stdio.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Endpoint path for the HTTP front-end.
    #[arg(long, default_value = "/mcp")]
    path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install a simple subscriber so `tracing` output is visible. Users can
    // control the log level with `RUST_LOG`. Stdout belongs to the framing
    // channel, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let server = build_server().await;

    match cli.bind {
        Some(bind) => {
            serve_http(
                server,
                HttpServerConfig {
                    bind,
                    path: cli.path,
                },
            )
            .await?;
        }
        None => serve_stdio(server).await?,
    }
    Ok(())
}

/// The built-in feature set: enough surface to exercise every capability
/// from a stock client.
async fn build_server() -> Arc<McpServer> {
    let server = McpServer::new(ServerConfig::default());

    server
        .add_tool(
            Tool {
                annotations: None,
                description: Some("Echo the input text back".to_string()),
                input_schema: ToolInputSchema {
                    properties: Some(json!({"text": {"type": "string"}})),
                    required: Some(vec!["text".to_string()]),
                    r#type: "object".to_string(),
                },
                name: "echo".to_string(),
                output_schema: None,
                title: None,
            },
            Arc::new(FnToolHandler(|arguments: Option<serde_json::Value>| async move {
                let text = arguments
                    .as_ref()
                    .and_then(|a| a.get("text"))
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| ToolError::new("missing required argument `text`"))?;
                Ok(ToolOutput::text(text))
            })),
        )
        .await;

    server
        .add_tool(
            Tool {
                annotations: None,
                description: Some("Add two integers".to_string()),
                input_schema: ToolInputSchema {
                    properties: Some(json!({
                        "a": {"type": "integer"},
                        "b": {"type": "integer"},
                    })),
                    required: Some(vec!["a".to_string(), "b".to_string()]),
                    r#type: "object".to_string(),
                },
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
                    content: vec![conduit_mcp_types::ContentBlock::text(sum.to_string())],
                    structured_content: Some(json!({"sum": sum})),
                })
            })),
        )
        .await;

    server
        .add_prompt(
            Prompt {
                arguments: Some(vec![PromptArgument {
                    description: Some("What to greet".to_string()),
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
                description: Some("Server build information".to_string()),
                mime_type: Some("text/plain".to_string()),
                name: "about".to_string(),
                title: None,
                uri: "conduit://about".to_string(),
            },
            Arc::new(StaticText(format!(
                "conduit-mcp-server {}",
                env!("CARGO_PKG_VERSION")
            ))),
        )
        .await;

    server
}
