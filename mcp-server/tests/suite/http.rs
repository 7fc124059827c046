use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use conduit_mcp_client::ClientConfig;
use conduit_mcp_client::McpClient;
use conduit_mcp_server::McpServer;
use conduit_mcp_server::StaticText;
use conduit_mcp_server::build_router;
use conduit_transport::HttpConfig;
use conduit_transport::HttpTransport;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time;

use crate::suite::test_server;

async fn spawn_http(server: Arc<McpServer>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind an ephemeral port");
    let addr = listener.local_addr().expect("must have a local addr");
    let router = build_router(server, "/mcp");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

fn http_config(addr: SocketAddr) -> HttpConfig {
    HttpConfig {
        base_url: format!("http://{addr}"),
        path: "/mcp".to_string(),
        headers: Default::default(),
        auth_token: None,
        allow_insecure: false,
    }
}

fn initialize_body() -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "capabilities": {},
            "clientInfo": {"name": "c", "version": "1"},
            "protocolVersion": "2025-06-18",
        },
    })
}

#[tokio::test]
async fn full_session_over_streamable_http() {
    let server = test_server().await;
    let addr = spawn_http(server.clone()).await;

    let transport = HttpTransport::new(&http_config(addr)).expect("transport must build");
    let client = McpClient::connect(Box::new(transport), ClientConfig::default());
    client.initialize().await.expect("handshake must succeed");
    assert!(client.session_id().is_some(), "the server must issue a session id");

    let result = client
        .call_tool("add".to_string(), Some(json!({"a": 2, "b": 3})), None)
        .await
        .expect("tools/call over http");
    assert_eq!(result.is_error, Some(false));

    // Server push arrives over the GET SSE stream.
    let mut updates = client
        .subscribe_resource("test://x".to_string(), None)
        .await
        .expect("resources/subscribe");
    // Give the background GET listener a moment to attach.
    time::sleep(Duration::from_millis(200)).await;
    server
        .update_resource("test://x", Arc::new(StaticText("two".to_string())))
        .await;

    let update = time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("update must arrive over sse")
        .expect("channel must stay open");
    assert_eq!(update.uri, "test://x");

    client.close().await.expect("close must succeed");
}

#[tokio::test]
async fn requests_without_a_session_header_are_rejected() {
    let addr = spawn_http(test_server().await).await;
    let http = reqwest::Client::new();

    let missing = http
        .post(format!("http://{addr}/mcp"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .send()
        .await
        .expect("request must complete");
    assert_eq!(missing.status().as_u16(), 400);

    let unknown = http
        .post(format!("http://{addr}/mcp"))
        .header("mcp-session-id", "not-a-session")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .send()
        .await
        .expect("request must complete");
    assert_eq!(unknown.status().as_u16(), 404);
}

#[tokio::test]
async fn protocol_version_header_is_enforced_on_latest_sessions() {
    let addr = spawn_http(test_server().await).await;
    let http = reqwest::Client::new();

    let init = http
        .post(format!("http://{addr}/mcp"))
        .json(&initialize_body())
        .send()
        .await
        .expect("initialize must complete");
    assert_eq!(init.status().as_u16(), 200);
    let session_id = init
        .headers()
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .expect("the server must issue a session id")
        .to_string();

    let no_version = http
        .post(format!("http://{addr}/mcp"))
        .header("mcp-session-id", &session_id)
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .send()
        .await
        .expect("request must complete");
    assert_eq!(no_version.status().as_u16(), 400);

    let with_version = http
        .post(format!("http://{addr}/mcp"))
        .header("mcp-session-id", &session_id)
        .header("mcp-protocol-version", "2025-06-18")
        .json(&json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}))
        .send()
        .await
        .expect("request must complete");
    assert_eq!(with_version.status().as_u16(), 200);
}

#[tokio::test]
async fn delete_terminates_the_session() {
    let addr = spawn_http(test_server().await).await;
    let http = reqwest::Client::new();

    let init = http
        .post(format!("http://{addr}/mcp"))
        .json(&initialize_body())
        .send()
        .await
        .expect("initialize must complete");
    let session_id = init
        .headers()
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .expect("the server must issue a session id")
        .to_string();

    let deleted = http
        .delete(format!("http://{addr}/mcp"))
        .header("mcp-session-id", &session_id)
        .send()
        .await
        .expect("delete must complete");
    assert_eq!(deleted.status().as_u16(), 204);

    let after = http
        .post(format!("http://{addr}/mcp"))
        .header("mcp-session-id", &session_id)
        .header("mcp-protocol-version", "2025-06-18")
        .json(&json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}))
        .send()
        .await
        .expect("request must complete");
    assert_eq!(after.status().as_u16(), 404);
}

#[tokio::test]
async fn batches_aggregate_in_order_and_empty_batches_are_invalid() {
    let addr = spawn_http(test_server().await).await;
    let http = reqwest::Client::new();

    let init = http
        .post(format!("http://{addr}/mcp"))
        .json(&initialize_body())
        .send()
        .await
        .expect("initialize must complete");
    let session_id = init
        .headers()
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .expect("the server must issue a session id")
        .to_string();
    // Complete the handshake so application methods pass the ready gate.
    let accepted = http
        .post(format!("http://{addr}/mcp"))
        .header("mcp-session-id", &session_id)
        .header("mcp-protocol-version", "2025-06-18")
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .send()
        .await
        .expect("notification must complete");
    assert_eq!(accepted.status().as_u16(), 202);

    let batch = http
        .post(format!("http://{addr}/mcp"))
        .header("mcp-session-id", &session_id)
        .header("mcp-protocol-version", "2025-06-18")
        .json(&json!([
            {"jsonrpc": "2.0", "id": 10, "method": "ping"},
            {"jsonrpc": "2.0", "id": 11, "method": "foo/bar"},
        ]))
        .send()
        .await
        .expect("batch must complete");
    assert_eq!(batch.status().as_u16(), 200);
    let replies: serde_json::Value = batch.json().await.expect("body must be json");
    assert_eq!(replies[0]["id"], json!(10));
    assert!(replies[0].get("result").is_some());
    assert_eq!(replies[1]["id"], json!(11));
    assert_eq!(replies[1]["error"]["code"], json!(-32601));

    let empty = http
        .post(format!("http://{addr}/mcp"))
        .header("mcp-session-id", &session_id)
        .header("mcp-protocol-version", "2025-06-18")
        .json(&json!([]))
        .send()
        .await
        .expect("empty batch must complete");
    assert_eq!(empty.status().as_u16(), 400);
    let body: serde_json::Value = empty.json().await.expect("body must be json");
    assert_eq!(body["error"]["code"], json!(-32600));
    assert_eq!(body["id"], serde_json::Value::Null);
}
