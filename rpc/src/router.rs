//! Outbound request correlation.
//!
//! The pending table is the engine's single mutable hot spot: the lock is
//! held only for insert/lookup/remove, never across handler execution or
//! I/O. An id is present iff a response is still awaited; the first terminal
//! event (response, wire error, timeout, cancellation, transport death)
//! removes it, and anything arriving later is logged and dropped.

use std::collections::HashMap;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use conduit_mcp_types::JSONRPCErrorError;
use conduit_mcp_types::RequestId;
use tokio::sync::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use crate::RpcError;

pub type PendingReceiver = oneshot::Receiver<Result<serde_json::Value, RpcError>>;
type PendingSender = oneshot::Sender<Result<serde_json::Value, RpcError>>;

pub struct RequestRouter {
    next_request_id: AtomicI64,
    pending: Mutex<HashMap<RequestId, PendingSender>>,
}

impl Default for RequestRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestRouter {
    pub fn new() -> Self {
        Self {
            next_request_id: AtomicI64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a fresh id and register a completion sink for it. Ids are
    /// strictly monotonic and never reused within a session.
    pub async fn register(&self) -> (RequestId, PendingReceiver) {
        let id = RequestId::Integer(self.next_request_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id.clone(), tx);
        }
        (id, rx)
    }

    /// Route a peer response to its waiting sink.
    pub async fn complete_ok(&self, id: &RequestId, result: serde_json::Value) {
        self.complete(id, Ok(result)).await;
    }

    /// Route a peer error to its waiting sink.
    pub async fn complete_err(&self, id: &RequestId, error: JSONRPCErrorError) {
        self.complete(id, Err(RpcError::Peer(error))).await;
    }

    async fn complete(&self, id: &RequestId, outcome: Result<serde_json::Value, RpcError>) {
        let entry = {
            let mut pending = self.pending.lock().await;
            pending.remove(id)
        };
        match entry {
            // A dropped receiver means the caller gave up; that was the
            // terminal event for this id.
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => warn!(%id, "no pending request found for response"),
        }
    }

    /// Forget a request after a timeout or caller cancellation so a late
    /// response is dropped instead of completing a stale sink.
    pub async fn forget(&self, id: &RequestId) -> bool {
        let mut pending = self.pending.lock().await;
        pending.remove(id).is_some()
    }

    /// Fail every in-flight request with `TransportClosed`. Called once when
    /// the transport dies or the session closes.
    pub async fn fail_all(&self) {
        let drained: Vec<PendingSender> = {
            let mut pending = self.pending.lock().await;
            pending.drain().map(|(_, tx)| tx).collect()
        };
        for tx in drained {
            let _ = tx.send(Err(RpcError::TransportClosed));
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
