use conduit_test_support::McpProcess;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn initialize_and_call_a_tool_through_the_binary() {
    let mut mcp = McpProcess::new().await.expect("server must spawn");

    let init = mcp
        .initialize("2025-06-18")
        .await
        .expect("handshake must succeed");
    assert_eq!(init.result["protocolVersion"], json!("2025-06-18"));
    assert_eq!(init.result["serverInfo"]["name"], json!("conduit-mcp-server"));

    let id = mcp
        .send_request(
            "tools/call",
            Some(json!({"name": "add", "arguments": {"a": 2, "b": 3}})),
        )
        .await
        .expect("request must send");
    let response = mcp.read_response(id).await.expect("response must arrive");
    assert_eq!(response.result["isError"], json!(false));
    assert_eq!(response.result["content"][0]["text"], json!("5"));
}

#[tokio::test]
async fn malformed_lines_get_parse_errors_and_the_connection_survives() {
    let mut mcp = McpProcess::new().await.expect("server must spawn");

    mcp.send_line("{this is not json").await.expect("line must send");
    let error = mcp.read_error(None).await.expect("parse error must arrive");
    assert_eq!(error["error"]["code"], json!(-32700));
    assert_eq!(error["id"], serde_json::Value::Null);

    // The connection stays open: a valid handshake still works.
    let init = mcp
        .initialize("2025-06-18")
        .await
        .expect("handshake must still succeed");
    assert_eq!(init.result["protocolVersion"], json!("2025-06-18"));
}

#[tokio::test]
async fn batch_responses_preserve_entry_order() {
    let mut mcp = McpProcess::new().await.expect("server must spawn");
    mcp.initialize("2025-06-18")
        .await
        .expect("handshake must succeed");

    mcp.send_line(
        &json!([
            {"jsonrpc": "2.0", "id": 100, "method": "ping"},
            {"jsonrpc": "2.0", "id": 101, "method": "foo/bar"},
            {"jsonrpc": "2.0", "method": "notifications/initialized"},
        ])
        .to_string(),
    )
    .await
    .expect("batch must send");

    let replies = mcp.read_raw().await.expect("batch response must arrive");
    let entries = replies.as_array().expect("batch response must be an array");
    // Notifications contribute no response entry.
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["id"], json!(100));
    assert!(entries[0].get("result").is_some());
    assert_eq!(entries[1]["id"], json!(101));
    assert_eq!(entries[1]["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn empty_batches_are_invalid_requests() {
    let mut mcp = McpProcess::new().await.expect("server must spawn");

    mcp.send_line("[]").await.expect("line must send");
    let error = mcp.read_error(None).await.expect("error must arrive");
    assert_eq!(error["error"]["code"], json!(-32600));
    assert_eq!(error["id"], serde_json::Value::Null);
}
