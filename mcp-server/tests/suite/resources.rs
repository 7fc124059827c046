use std::sync::Arc;
use std::time::Duration;

use conduit_mcp_server::StaticText;
use conduit_mcp_types::Resource;
use conduit_mcp_types::ResourceContents;
use pretty_assertions::assert_eq;
use tokio::time;

use crate::suite::ready_client;
use crate::suite::test_server;

#[tokio::test]
async fn read_goes_through_the_producer() {
    let client = ready_client(test_server().await, "2025-06-18").await;
    let result = client
        .read_resource("test://x".to_string(), None)
        .await
        .expect("resources/read");
    let ResourceContents::Text(text) = &result.contents[0] else {
        panic!("expected text contents");
    };
    assert_eq!(text.text, "one");
    assert_eq!(text.uri, "test://x");
}

#[tokio::test]
async fn subscriber_sees_updates_exactly_once_and_in_order() {
    let server = test_server().await;
    let client = ready_client(server.clone(), "2025-06-18").await;

    let mut updates = client
        .subscribe_resource("test://x".to_string(), None)
        .await
        .expect("resources/subscribe");

    assert!(
        server
            .update_resource("test://x", Arc::new(StaticText("two".to_string())))
            .await
    );
    assert!(
        server
            .update_resource("test://x", Arc::new(StaticText("three".to_string())))
            .await
    );

    for _ in 0..2 {
        let update = time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .expect("update must arrive")
            .expect("channel must stay open");
        assert_eq!(update.uri, "test://x");
    }
    // Exactly once per update: nothing further is queued.
    let extra = time::timeout(Duration::from_millis(100), updates.recv()).await;
    assert!(extra.is_err(), "no third notification may arrive");

    // The read now reflects the last producer.
    let result = client
        .read_resource("test://x".to_string(), None)
        .await
        .expect("resources/read");
    let ResourceContents::Text(text) = &result.contents[0] else {
        panic!("expected text contents");
    };
    assert_eq!(text.text, "three");
}

#[tokio::test]
async fn updates_for_unsubscribed_uris_are_not_delivered() {
    let server = test_server().await;
    server
        .add_resource(
            Resource {
                description: None,
                mime_type: Some("text/plain".to_string()),
                name: "y".to_string(),
                title: None,
                uri: "test://y".to_string(),
            },
            Arc::new(StaticText("other".to_string())),
        )
        .await;
    let client = ready_client(server.clone(), "2025-06-18").await;

    let mut updates = client
        .subscribe_resource("test://x".to_string(), None)
        .await
        .expect("resources/subscribe");

    assert!(
        server
            .update_resource("test://y", Arc::new(StaticText("changed".to_string())))
            .await
    );

    let nothing = time::timeout(Duration::from_millis(200), updates.recv()).await;
    assert!(nothing.is_err(), "updates for test://y must not be delivered");
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let server = test_server().await;
    let client = ready_client(server.clone(), "2025-06-18").await;

    let mut updates = client
        .subscribe_resource("test://x".to_string(), None)
        .await
        .expect("resources/subscribe");
    client
        .unsubscribe_resource("test://x".to_string(), None)
        .await
        .expect("resources/unsubscribe");

    server
        .update_resource("test://x", Arc::new(StaticText("two".to_string())))
        .await;

    let nothing = time::timeout(Duration::from_millis(200), updates.recv()).await;
    assert!(nothing.is_err(), "no delivery after unsubscribe");
}

#[tokio::test]
async fn registry_changes_fire_list_changed() {
    let server = test_server().await;
    let client = ready_client(server.clone(), "2025-06-18").await;

    let mut changed = client.subscribe_resources_changed();
    server
        .add_resource(
            Resource {
                description: None,
                mime_type: None,
                name: "z".to_string(),
                title: None,
                uri: "test://z".to_string(),
            },
            Arc::new(StaticText(String::new())),
        )
        .await;

    time::timeout(Duration::from_secs(5), changed.recv())
        .await
        .expect("list_changed must arrive")
        .expect("channel must stay open");
}
