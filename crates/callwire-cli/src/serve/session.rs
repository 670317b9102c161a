//! Peer store: connected clients, their subscribed calls, and how far each
//! call has progressed through its lifecycle.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use callwire_client::{iso_timestamp_now, CallId, ServerMessage};
use serde_json::json;
use tokio::sync::{mpsc, RwLock};

/// Lifecycle every subscribed call walks through, one step per tick.
pub const LIFECYCLE: [&str; 3] = ["ringing", "answered", "ended"];

struct TrackedCall {
    call_id: CallId,
    stage: usize,
}

struct Peer {
    tx: mpsc::Sender<String>,
    calls: Vec<TrackedCall>,
}

/// Thread-safe peer store.
#[derive(Clone, Default)]
pub struct PeerStore {
    peers: Arc<RwLock<HashMap<SocketAddr, Peer>>>,
}

impl PeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, addr: SocketAddr, tx: mpsc::Sender<String>) {
        self.peers.write().await.insert(
            addr,
            Peer {
                tx,
                calls: Vec::new(),
            },
        );
    }

    /// Returns true if the peer was registered.
    pub async fn unregister(&self, addr: SocketAddr) -> bool {
        self.peers.write().await.remove(&addr).is_some()
    }

    /// Start the lifecycle of `call_id` for `addr`. Returns false if the
    /// peer is unknown or the call is already in progress for it.
    pub async fn subscribe(&self, addr: SocketAddr, call_id: CallId) -> bool {
        let mut peers = self.peers.write().await;
        let Some(peer) = peers.get_mut(&addr) else {
            return false;
        };
        if peer.calls.iter().any(|call| call.call_id == call_id) {
            return false;
        }
        peer.calls.push(TrackedCall { call_id, stage: 0 });
        true
    }

    /// Advance every tracked call one step. Returns the frames to deliver
    /// and forgets calls that reached the end of the lifecycle.
    pub async fn tick(&self) -> Vec<(mpsc::Sender<String>, ServerMessage)> {
        let mut peers = self.peers.write().await;
        let mut frames = Vec::new();

        for peer in peers.values_mut() {
            for call in &mut peer.calls {
                let message = ServerMessage::CallEvent {
                    call_id: Some(call.call_id.clone()),
                    data: json!({
                        "type": LIFECYCLE[call.stage],
                        "timestamp": iso_timestamp_now(),
                    }),
                };
                frames.push((peer.tx.clone(), message));
                call.stage += 1;
            }
            peer.calls.retain(|call| call.stage < LIFECYCLE.len());
        }
        frames
    }

    /// Number of connected peers.
    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn event_type(message: &ServerMessage) -> &str {
        match message {
            ServerMessage::CallEvent { data, .. } => data["type"].as_str().unwrap(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn calls_walk_the_lifecycle_then_drop_out() {
        let store = PeerStore::new();
        let (tx, _rx) = mpsc::channel(8);
        store.register(addr(1), tx).await;
        assert!(store.subscribe(addr(1), CallId::from("c1")).await);

        let mut seen = Vec::new();
        for _ in 0..LIFECYCLE.len() {
            let frames = store.tick().await;
            assert_eq!(frames.len(), 1);
            seen.push(event_type(&frames[0].1).to_string());
        }
        assert_eq!(seen, LIFECYCLE);
        assert!(store.tick().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_and_unknown_subscriptions_are_rejected() {
        let store = PeerStore::new();
        let (tx, _rx) = mpsc::channel(8);
        store.register(addr(1), tx).await;

        assert!(store.subscribe(addr(1), CallId::from(5_i64)).await);
        assert!(!store.subscribe(addr(1), CallId::from(5_i64)).await);
        assert!(!store.subscribe(addr(2), CallId::from(5_i64)).await);
    }

    #[tokio::test]
    async fn unregister_stops_delivery() {
        let store = PeerStore::new();
        let (tx, _rx) = mpsc::channel(8);
        store.register(addr(1), tx).await;
        store.subscribe(addr(1), CallId::from("c1")).await;
        assert_eq!(store.count().await, 1);

        assert!(store.unregister(addr(1)).await);
        assert!(!store.unregister(addr(1)).await);
        assert_eq!(store.count().await, 0);
        assert!(store.tick().await.is_empty());
    }
}
