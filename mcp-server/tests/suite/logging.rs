use std::time::Duration;

use conduit_mcp_types::LoggingLevel;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time;

use crate::suite::ready_client;
use crate::suite::test_server;

#[tokio::test]
async fn messages_below_the_threshold_are_filtered_server_side() {
    let server = test_server().await;
    let client = ready_client(server.clone(), "2025-06-18").await;
    let mut log_rx = client.subscribe_log_messages();

    client
        .set_level(LoggingLevel::Warning, None)
        .await
        .expect("logging/setLevel");

    server
        .log_message(LoggingLevel::Info, None, json!("below threshold"))
        .await;
    server
        .log_message(
            LoggingLevel::Error,
            Some("core".to_string()),
            json!("disk failure"),
        )
        .await;

    let delivered = time::timeout(Duration::from_secs(5), log_rx.recv())
        .await
        .expect("the error message must arrive")
        .expect("channel must stay open");
    assert_eq!(delivered.level, LoggingLevel::Error);
    assert_eq!(delivered.logger.as_deref(), Some("core"));
    assert_eq!(delivered.data, json!("disk failure"));

    // The info message was filtered before emission, so nothing else is
    // queued.
    let nothing = time::timeout(Duration::from_millis(100), log_rx.recv()).await;
    assert!(nothing.is_err(), "filtered messages must not be delivered");
}

#[tokio::test]
async fn everything_passes_before_set_level() {
    let server = test_server().await;
    let client = ready_client(server.clone(), "2025-06-18").await;
    let mut log_rx = client.subscribe_log_messages();

    server
        .log_message(LoggingLevel::Debug, None, json!("chatty"))
        .await;

    let delivered = time::timeout(Duration::from_secs(5), log_rx.recv())
        .await
        .expect("the debug message must arrive")
        .expect("channel must stay open");
    assert_eq!(delivered.level, LoggingLevel::Debug);
}
