use conduit_mcp_types::CallToolResult;
use conduit_mcp_types::ContentBlock;
use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::JSONRPCNotification;
use conduit_mcp_types::JSONRPCResponse;
use conduit_mcp_types::LoggingLevel;
use conduit_mcp_types::RequestId;
use conduit_mcp_types::ServerNotification;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn request_wins_over_notification_when_id_present() {
    let raw = r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#;
    let msg: JSONRPCMessage = serde_json::from_str(raw).expect("must deserialize");
    let JSONRPCMessage::Request(req) = msg else {
        panic!("a message with an id must parse as a request, got {msg:?}");
    };
    assert_eq!(req.id, RequestId::String("abc".into()));
}

#[test]
fn notification_has_no_id() {
    let raw = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
    let msg: JSONRPCMessage = serde_json::from_str(raw).expect("must deserialize");
    assert!(matches!(msg, JSONRPCMessage::Notification(_)));
}

#[test]
fn error_and_response_are_distinguished_by_member() {
    let err: JSONRPCMessage = serde_json::from_str(
        r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
    )
    .expect("must deserialize");
    assert!(matches!(err, JSONRPCMessage::Error(_)));

    let resp: JSONRPCMessage =
        serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).expect("must deserialize");
    assert!(matches!(resp, JSONRPCMessage::Response(resp) if resp.id == RequestId::Integer(1)));
}

#[test]
fn integer_ids_normalize_to_one_type() {
    // A decoded id must compare equal to a constructed one, because the
    // pending table is keyed by it.
    let decoded: JSONRPCResponse =
        serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"result":{}}"#).expect("must deserialize");
    assert_eq!(decoded.id, RequestId::Integer(7));
    assert_ne!(decoded.id, RequestId::String("7".into()));
}

#[test]
fn content_blocks_round_trip_with_type_tags() {
    let result = CallToolResult {
        content: vec![ContentBlock::text("5")],
        is_error: Some(false),
        structured_content: None,
    };
    let encoded = serde_json::to_value(&result).expect("must serialize");
    assert_eq!(
        encoded,
        json!({"content": [{"type": "text", "text": "5"}], "isError": false})
    );
    let decoded: CallToolResult = serde_json::from_value(encoded).expect("must deserialize");
    assert_eq!(decoded, result);
}

#[test]
fn logging_message_notification_converts() {
    let n = JSONRPCNotification {
        jsonrpc: "2.0".into(),
        method: "notifications/message".into(),
        params: Some(json!({"level": "warning", "data": "disk is 90% full"})),
    };
    let converted = ServerNotification::try_from(n).expect("conversion must succeed");
    let ServerNotification::LoggingMessageNotification(params) = converted else {
        panic!("expected a logging message notification");
    };
    assert_eq!(params.level, LoggingLevel::Warning);
    assert_eq!(params.data, json!("disk is 90% full"));
}

#[test]
fn logging_levels_order_by_severity() {
    assert!(LoggingLevel::Debug < LoggingLevel::Info);
    assert!(LoggingLevel::Warning < LoggingLevel::Error);
    assert!(LoggingLevel::Alert < LoggingLevel::Emergency);
}
