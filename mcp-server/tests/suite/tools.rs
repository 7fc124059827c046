use conduit_mcp_types::ContentBlock;
use conduit_mcp_types::TextContent;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::suite::ready_client;
use crate::suite::test_server;

fn text_of(block: &ContentBlock) -> &str {
    let ContentBlock::TextContent(TextContent { text, .. }) = block else {
        panic!("expected text content, got {block:?}");
    };
    text
}

#[tokio::test]
async fn tools_list_contains_the_registered_tools() {
    let client = ready_client(test_server().await, "2025-06-18").await;
    let result = client.list_tools(None, None).await.expect("tools/list");
    let mut names: Vec<&str> = result.tools.iter().map(|t| t.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["add", "boom"]);
}

#[tokio::test]
async fn tool_call_returns_content_and_structured_output() {
    let client = ready_client(test_server().await, "2025-06-18").await;
    let result = client
        .call_tool("add".to_string(), Some(json!({"a": 2, "b": 3})), None)
        .await
        .expect("tools/call");

    assert_eq!(result.is_error, Some(false));
    assert_eq!(text_of(&result.content[0]), "5");
    assert_eq!(result.structured_content, Some(json!({"sum": 5})));
}

#[tokio::test]
async fn tool_failure_is_a_result_not_a_wire_error() {
    let client = ready_client(test_server().await, "2025-06-18").await;
    let result = client
        .call_tool("boom".to_string(), None, None)
        .await
        .expect("a failing tool still yields a result");

    assert_eq!(result.is_error, Some(true));
    assert_eq!(text_of(&result.content[0]), "boom");
}

#[tokio::test]
async fn structured_content_is_stripped_on_older_sessions() {
    let client = ready_client(test_server().await, "2025-03-26").await;
    let result = client
        .call_tool("add".to_string(), Some(json!({"a": 2, "b": 3})), None)
        .await
        .expect("tools/call");

    assert_eq!(text_of(&result.content[0]), "5");
    assert_eq!(result.structured_content, None);
}

#[tokio::test]
async fn removing_a_tool_fires_list_changed_and_shrinks_the_list() {
    let server = test_server().await;
    let client = ready_client(server.clone(), "2025-06-18").await;
    let mut changed = client.subscribe_tools_changed();

    assert!(server.remove_tool("boom").await);
    tokio::time::timeout(std::time::Duration::from_secs(5), changed.recv())
        .await
        .expect("list_changed must arrive")
        .expect("channel must stay open");

    let result = client.list_tools(None, None).await.expect("tools/list");
    let names: Vec<&str> = result.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["add"]);
}

#[tokio::test]
async fn unknown_tool_reports_is_error() {
    let client = ready_client(test_server().await, "2025-06-18").await;
    let result = client
        .call_tool("nope".to_string(), None, None)
        .await
        .expect("unknown tool still yields a result");

    assert_eq!(result.is_error, Some(true));
    assert_eq!(text_of(&result.content[0]), "Unknown tool 'nope'");
}
