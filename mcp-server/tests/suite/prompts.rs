use std::collections::HashMap;

use conduit_mcp_types::ContentBlock;
use conduit_mcp_types::TextContent;
use conduit_rpc::RpcError;
use pretty_assertions::assert_eq;

use crate::suite::ready_client;
use crate::suite::test_server;

fn first_text(result: &conduit_mcp_types::GetPromptResult) -> &str {
    let ContentBlock::TextContent(TextContent { text, .. }) = &result.messages[0].content else {
        panic!("expected text content");
    };
    text
}

#[tokio::test]
async fn prompts_list_and_get_substitute_arguments() {
    let client = ready_client(test_server().await, "2025-06-18").await;

    let listed = client.list_prompts(None, None).await.expect("prompts/list");
    assert_eq!(listed.prompts.len(), 1);
    assert_eq!(listed.prompts[0].name, "greet");

    let args = HashMap::from([("subject".to_string(), "world".to_string())]);
    let result = client
        .get_prompt("greet".to_string(), Some(args), None)
        .await
        .expect("prompts/get");
    assert_eq!(first_text(&result), "Say hello to world.");
}

#[tokio::test]
async fn missing_arguments_render_permissively() {
    let client = ready_client(test_server().await, "2025-06-18").await;
    let result = client
        .get_prompt("greet".to_string(), None, None)
        .await
        .expect("prompts/get");
    assert_eq!(first_text(&result), "Say hello to {subject}.");
}

#[tokio::test]
async fn unknown_prompt_is_invalid_params() {
    let client = ready_client(test_server().await, "2025-06-18").await;
    let err = client
        .get_prompt("nope".to_string(), None, None)
        .await
        .expect_err("unknown prompt must fail");
    let RpcError::Peer(wire) = err else {
        panic!("expected a wire error, got {err:?}");
    };
    assert_eq!(wire.code, -32602);
}
