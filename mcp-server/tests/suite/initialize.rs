use conduit_mcp_client::ClientConfig;
use conduit_mcp_client::McpClient;
use conduit_mcp_client::SessionState;
use conduit_mcp_server::serve_in_memory;
use conduit_mcp_types::ProtocolVersion;
use conduit_mcp_types::ServerCapabilitiesTools;
use conduit_rpc::RpcError;
use pretty_assertions::assert_eq;

use crate::suite::ready_client;
use crate::suite::test_server;

#[tokio::test]
async fn initialize_latest_reaches_ready() {
    let client = ready_client(test_server().await, "2025-06-18").await;

    assert_eq!(client.state(), SessionState::Ready);
    assert_eq!(
        client.negotiated_version(),
        Some(ProtocolVersion::V2025_06_18)
    );

    let info = client.server_info().expect("server info must be pinned");
    assert_eq!(info.name, "conduit-mcp-server");
    assert_eq!(client.instructions().as_deref(), Some("test fixture"));

    let caps = client
        .server_capabilities()
        .expect("capabilities must be pinned");
    assert_eq!(
        caps.tools,
        Some(ServerCapabilitiesTools {
            list_changed: Some(true),
        })
    );
}

#[tokio::test]
async fn future_proposal_downgrades_to_latest_supported() {
    let client = ready_client(test_server().await, "2099-01-01").await;
    assert_eq!(
        client.negotiated_version(),
        Some(ProtocolVersion::V2025_06_18)
    );
}

#[tokio::test]
async fn old_revision_negotiates_exactly_and_flattens_capabilities() {
    let client = ready_client(test_server().await, "2025-03-26").await;
    assert_eq!(
        client.negotiated_version(),
        Some(ProtocolVersion::V2025_03_26)
    );

    // The flat capability shape carries presence only; option fields are
    // not part of that revision's wire form.
    let caps = client
        .server_capabilities()
        .expect("capabilities must be pinned");
    assert_eq!(caps.tools, Some(ServerCapabilitiesTools::default()));
    assert!(caps.resources.is_some());
}

#[tokio::test]
async fn prehistoric_proposal_is_rejected_and_session_fails() {
    let transport = serve_in_memory(test_server().await);
    let config = ClientConfig {
        protocol_version: "2020-01-01".to_string(),
        ..ClientConfig::default()
    };
    let client = McpClient::new_in_memory_client(transport, config);

    let err = client.initialize().await.expect_err("handshake must fail");
    let RpcError::Peer(wire) = err else {
        panic!("expected the server's wire error, got {err:?}");
    };
    assert_eq!(wire.code, -32602);
    assert_eq!(client.state(), SessionState::Failed);
}

#[tokio::test]
async fn unknown_method_gets_32601_and_state_is_unchanged() {
    let client = ready_client(test_server().await, "2025-06-18").await;

    let err = client
        .request("foo/bar", None, None)
        .await
        .expect_err("unknown method must fail");
    let RpcError::Peer(wire) = err else {
        panic!("expected a wire error, got {err:?}");
    };
    assert_eq!(wire.code, -32601);
    assert_eq!(wire.message, "Method not found");

    // Engine state unchanged: the session still answers.
    client.ping(None).await.expect("ping must still work");
    assert_eq!(client.state(), SessionState::Ready);
}
