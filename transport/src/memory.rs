//! In-process loopback transport: two bounded queues and a shared liveness
//! flag. Connects a client and a server in the same process with the same
//! FIFO and at-most-once guarantees as the real transports.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use conduit_mcp_types::JSONRPCMessage;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::Transport;
use crate::TransportError;
use crate::TransportEvent;

const CHANNEL_CAPACITY: usize = 128;

#[derive(Debug)]
struct Shared {
    alive: AtomicBool,
    /// Synthetic session identifier so session-scoped feature code sees a
    /// consistent interface across transports.
    session_id: String,
}

/// One endpoint of an in-memory pair.
#[derive(Debug)]
pub struct InMemoryTransport {
    outgoing_tx: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    incoming_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    shared: Arc<Shared>,
    /// Set once the terminal `Closed` event has been handed to `recv`.
    closed_delivered: AtomicBool,
}

impl InMemoryTransport {
    /// Create a connected (client, server) endpoint pair.
    pub fn pair() -> (InMemoryTransport, InMemoryTransport) {
        let (a_tx, a_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (b_tx, b_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            alive: AtomicBool::new(true),
            session_id: Uuid::new_v4().to_string(),
        });
        let client = InMemoryTransport {
            outgoing_tx: Mutex::new(Some(a_tx)),
            incoming_rx: Mutex::new(b_rx),
            shared: shared.clone(),
            closed_delivered: AtomicBool::new(false),
        };
        let server = InMemoryTransport {
            outgoing_tx: Mutex::new(Some(b_tx)),
            incoming_rx: Mutex::new(a_rx),
            shared,
            closed_delivered: AtomicBool::new(false),
        };
        (client, server)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, msg: JSONRPCMessage) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError::Closed);
        }
        let tx = {
            let guard = self.outgoing_tx.lock().await;
            guard.clone()
        };
        match tx {
            Some(tx) => tx
                .send(TransportEvent::Message(msg))
                .await
                .map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    async fn recv(&self) -> Option<TransportEvent> {
        let next = self.incoming_rx.lock().await.recv().await;
        match next {
            Some(event) => Some(event),
            // Peer dropped its sender: surface one terminal Closed, then
            // report exhaustion.
            None => {
                if self.closed_delivered.swap(true, Ordering::SeqCst) {
                    None
                } else {
                    Some(TransportEvent::Closed)
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shared.alive.store(false, Ordering::SeqCst);
        // Dropping our sender is what the peer observes as disconnect.
        self.outgoing_tx.lock().await.take();
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> Option<String> {
        Some(self.shared.session_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_mcp_types::JSONRPCNotification;
    use pretty_assertions::assert_eq;

    fn notification(method: &str) -> JSONRPCMessage {
        JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: conduit_mcp_types::JSONRPC_VERSION.into(),
            method: method.into(),
            params: None,
        })
    }

    #[tokio::test]
    async fn messages_arrive_in_fifo_order() {
        let (client, server) = InMemoryTransport::pair();
        for method in ["a", "b", "c"] {
            client.send(notification(method)).await.expect("send must succeed");
        }
        for expected in ["a", "b", "c"] {
            let Some(TransportEvent::Message(JSONRPCMessage::Notification(n))) =
                server.recv().await
            else {
                panic!("expected a notification");
            };
            assert_eq!(n.method, expected);
        }
    }

    #[tokio::test]
    async fn both_ends_share_one_session_id() {
        let (client, server) = InMemoryTransport::pair();
        assert_eq!(client.session_id(), server.session_id());
        assert!(client.session_id().is_some());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_flips_liveness_for_both_ends() {
        let (client, server) = InMemoryTransport::pair();
        assert!(client.is_alive());
        client.close().await.expect("close must succeed");
        client.close().await.expect("second close must succeed");
        assert!(!client.is_alive());
        assert!(!server.is_alive());
        // The peer sees exactly one terminal Closed event.
        assert!(matches!(server.recv().await, Some(TransportEvent::Closed)));
        assert!(server.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_fails_without_delivery() {
        let (client, server) = InMemoryTransport::pair();
        client.close().await.expect("close must succeed");
        let err = client
            .send(notification("late"))
            .await
            .expect_err("send after close must fail");
        assert!(matches!(err, TransportError::Closed));
        assert!(matches!(server.recv().await, Some(TransportEvent::Closed)));
    }
}
