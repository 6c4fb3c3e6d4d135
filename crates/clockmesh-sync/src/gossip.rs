//! Gossip substrate abstraction.
//!
//! The engine never talks to a concrete network; it subscribes handlers to
//! topics, publishes envelope bytes, and brokers direct channels through
//! this trait. Implementations may sit on libp2p, a relay, or anything
//! else. The in-memory substrate below delivers inline and keeps a
//! published-message log for assertions.

use async_trait::async_trait;
use tokio::sync::mpsc;

use clockmesh_core::{PeerId, ProvingKey};

use crate::channel::PublicChannel;
use crate::error::Result;
use crate::messages::GossipMessage;

/// A subscriber receiving messages for a topic.
#[async_trait]
pub trait GossipHandler: Send + Sync {
    /// Handle one delivered message.
    ///
    /// Errors are reported back to the substrate for logging only; they
    /// never stop delivery to other subscribers.
    async fn on_message(&self, message: GossipMessage) -> Result<()>;
}

/// The pub/sub and direct-channel surface the engine runs on.
#[async_trait]
pub trait GossipSubstrate: Send + Sync {
    /// This node's peer identity.
    fn local_peer_id(&self) -> PeerId;

    /// Subscribe a handler to a topic.
    ///
    /// Re-subscribing the same peer to the same topic replaces the handler
    /// rather than duplicating delivery. With `replay_history` the handler
    /// also receives messages published before it subscribed.
    async fn subscribe(
        &self,
        topic: Vec<u8>,
        handler: std::sync::Arc<dyn GossipHandler>,
        replay_history: bool,
    ) -> Result<()>;

    /// Publish bytes on a topic.
    async fn publish(&self, topic: Vec<u8>, data: Vec<u8>) -> Result<()>;

    /// Register a direct-channel listener under a proving key.
    ///
    /// Each accepted channel is handed to `accepted`; the listener lives
    /// until the receiver side of `accepted` is dropped.
    async fn start_direct_channel_listener(
        &self,
        key: &ProvingKey,
        accepted: mpsc::Sender<PublicChannel>,
    ) -> Result<()>;

    /// Dial the peer listening under a proving key.
    async fn dial_direct_channel(&self, key: &ProvingKey) -> Result<PublicChannel>;
}

/// In-memory gossip substrate for testing.
///
/// Delivery is inline and sequential: `publish` awaits every subscribed
/// handler before returning, which makes tests deterministic.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tracing::debug;

    use crate::channel::DEFAULT_MAX_MESSAGE_SIZE;
    use crate::error::SyncError;

    /// A record of one published message, for test assertions.
    #[derive(Debug, Clone)]
    pub struct PublishedMessage {
        pub topic: Vec<u8>,
        pub from: PeerId,
        pub data: Vec<u8>,
    }

    struct Subscription {
        peer: PeerId,
        handler: Arc<dyn GossipHandler>,
    }

    struct NetworkState {
        subscriptions: HashMap<Vec<u8>, Vec<Subscription>>,
        history: HashMap<Vec<u8>, Vec<PublishedMessage>>,
        published: Vec<PublishedMessage>,
        listeners: HashMap<ProvingKey, mpsc::Sender<PublicChannel>>,
    }

    /// Shared state for an in-memory gossip network.
    pub struct MemoryGossipNetwork {
        state: RwLock<NetworkState>,
        channel_message_limit: usize,
    }

    impl MemoryGossipNetwork {
        /// Create a new network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                state: RwLock::new(NetworkState {
                    subscriptions: HashMap::new(),
                    history: HashMap::new(),
                    published: Vec::new(),
                    listeners: HashMap::new(),
                }),
                channel_message_limit: DEFAULT_MAX_MESSAGE_SIZE,
            })
        }

        /// Create a substrate handle for one peer on this network.
        pub fn create_gossip(self: &Arc<Self>, peer_id: PeerId) -> MemoryGossip {
            MemoryGossip {
                peer_id,
                network: Arc::clone(self),
            }
        }

        /// Snapshot of everything published so far.
        pub async fn published(&self) -> Vec<PublishedMessage> {
            self.state.read().await.published.clone()
        }

        /// True if `peer` currently has a subscription on `topic`.
        pub async fn is_subscribed(&self, topic: &[u8], peer: &PeerId) -> bool {
            let state = self.state.read().await;
            state
                .subscriptions
                .get(topic)
                .map(|subs| subs.iter().any(|s| &s.peer == peer))
                .unwrap_or(false)
        }

        async fn deliver(
            &self,
            handlers: Vec<Arc<dyn GossipHandler>>,
            message: &PublishedMessage,
        ) {
            for handler in handlers {
                let delivered = GossipMessage {
                    from: message.from.clone(),
                    data: message.data.clone(),
                    signature: Vec::new(),
                };
                if let Err(e) = handler.on_message(delivered).await {
                    debug!(from = %message.from, error = %e, "gossip handler reported an error");
                }
            }
        }
    }

    /// One peer's handle onto a [`MemoryGossipNetwork`].
    pub struct MemoryGossip {
        peer_id: PeerId,
        network: Arc<MemoryGossipNetwork>,
    }

    #[async_trait]
    impl GossipSubstrate for MemoryGossip {
        fn local_peer_id(&self) -> PeerId {
            self.peer_id.clone()
        }

        async fn subscribe(
            &self,
            topic: Vec<u8>,
            handler: Arc<dyn GossipHandler>,
            replay_history: bool,
        ) -> Result<()> {
            let backlog = {
                let mut state = self.network.state.write().await;
                let subs = state.subscriptions.entry(topic.clone()).or_default();
                match subs.iter_mut().find(|s| s.peer == self.peer_id) {
                    Some(existing) => existing.handler = Arc::clone(&handler),
                    None => subs.push(Subscription {
                        peer: self.peer_id.clone(),
                        handler: Arc::clone(&handler),
                    }),
                }
                if replay_history {
                    state.history.get(&topic).cloned().unwrap_or_default()
                } else {
                    Vec::new()
                }
            };
            for message in &backlog {
                self.network.deliver(vec![Arc::clone(&handler)], message).await;
            }
            Ok(())
        }

        async fn publish(&self, topic: Vec<u8>, data: Vec<u8>) -> Result<()> {
            let message = PublishedMessage {
                topic: topic.clone(),
                from: self.peer_id.clone(),
                data,
            };
            let handlers: Vec<Arc<dyn GossipHandler>> = {
                let mut state = self.network.state.write().await;
                state.published.push(message.clone());
                state
                    .history
                    .entry(topic.clone())
                    .or_default()
                    .push(message.clone());
                state
                    .subscriptions
                    .get(&topic)
                    .map(|subs| subs.iter().map(|s| Arc::clone(&s.handler)).collect())
                    .unwrap_or_default()
            };
            self.network.deliver(handlers, &message).await;
            Ok(())
        }

        async fn start_direct_channel_listener(
            &self,
            key: &ProvingKey,
            accepted: mpsc::Sender<PublicChannel>,
        ) -> Result<()> {
            let mut state = self.network.state.write().await;
            state.listeners.insert(key.clone(), accepted);
            Ok(())
        }

        async fn dial_direct_channel(&self, key: &ProvingKey) -> Result<PublicChannel> {
            let listener = {
                let state = self.network.state.read().await;
                state.listeners.get(key).cloned()
            };
            let listener = listener.ok_or_else(|| {
                SyncError::Transport(format!("no listener for key {}", key.to_hex()))
            })?;
            let (ours, theirs) = PublicChannel::pair(self.network.channel_message_limit);
            if listener.send(theirs).await.is_err() {
                // The accepting side dropped its receiver; clear the dead
                // registration unless a fresh listener replaced it meanwhile.
                let mut state = self.network.state.write().await;
                if state.listeners.get(key).is_some_and(|l| l.is_closed()) {
                    state.listeners.remove(key);
                }
                return Err(SyncError::Transport("listener went away".into()));
            }
            Ok(ours)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryGossipNetwork;
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<GossipMessage>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GossipHandler for Recorder {
        async fn on_message(&self, message: GossipMessage) -> Result<()> {
            self.seen.lock().await.push(message);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let network = MemoryGossipNetwork::new();
        let alice = network.create_gossip(PeerId::from_bytes(vec![0xa1]));
        let bob = network.create_gossip(PeerId::from_bytes(vec![0xb0]));

        let recorder = Recorder::new();
        bob.subscribe(b"topic".to_vec(), recorder.clone(), false)
            .await
            .unwrap();
        alice.publish(b"topic".to_vec(), vec![1, 2, 3]).await.unwrap();

        let seen = recorder.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].from, alice.local_peer_id());
        assert_eq!(seen[0].data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_replay_history_on_subscribe() {
        let network = MemoryGossipNetwork::new();
        let alice = network.create_gossip(PeerId::from_bytes(vec![0xa1]));
        let bob = network.create_gossip(PeerId::from_bytes(vec![0xb0]));

        alice.publish(b"topic".to_vec(), vec![7]).await.unwrap();

        let recorder = Recorder::new();
        bob.subscribe(b"topic".to_vec(), recorder.clone(), true)
            .await
            .unwrap();

        assert_eq!(recorder.seen.lock().await.len(), 1);

        let late = Recorder::new();
        bob.subscribe(b"other".to_vec(), late.clone(), false)
            .await
            .unwrap();
        assert!(late.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_handler() {
        let network = MemoryGossipNetwork::new();
        let alice = network.create_gossip(PeerId::from_bytes(vec![0xa1]));
        let bob = network.create_gossip(PeerId::from_bytes(vec![0xb0]));

        let first = Recorder::new();
        let second = Recorder::new();
        bob.subscribe(b"t".to_vec(), first.clone(), false).await.unwrap();
        bob.subscribe(b"t".to_vec(), second.clone(), false).await.unwrap();

        alice.publish(b"t".to_vec(), vec![9]).await.unwrap();

        assert!(first.seen.lock().await.is_empty());
        assert_eq!(second.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_direct_channel_dial() {
        let network = MemoryGossipNetwork::new();
        let alice = network.create_gossip(PeerId::from_bytes(vec![0xa1]));
        let bob = network.create_gossip(PeerId::from_bytes(vec![0xb0]));
        let key = ProvingKey::from_bytes(vec![0x5a; 8]);

        let (accepted_tx, mut accepted_rx) = mpsc::channel(1);
        alice
            .start_direct_channel_listener(&key, accepted_tx)
            .await
            .unwrap();

        let bob_end = bob.dial_direct_channel(&key).await.unwrap();
        let alice_end = accepted_rx.recv().await.unwrap();

        bob_end.send(Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(alice_end.recv().await.unwrap(), Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn test_abandoned_listener_is_unregistered_on_dial() {
        let network = MemoryGossipNetwork::new();
        let alice = network.create_gossip(PeerId::from_bytes(vec![0xa1]));
        let bob = network.create_gossip(PeerId::from_bytes(vec![0xb0]));
        let key = ProvingKey::from_bytes(vec![0x5a; 8]);

        let (accepted_tx, accepted_rx) = mpsc::channel(1);
        alice
            .start_direct_channel_listener(&key, accepted_tx)
            .await
            .unwrap();
        drop(accepted_rx);

        let err = bob.dial_direct_channel(&key).await.err().unwrap();
        assert!(err.to_string().contains("listener went away"));

        // The dead registration is gone, so a later dial sees no listener
        // at all rather than tripping over the stale sender again.
        let err = bob.dial_direct_channel(&key).await.err().unwrap();
        assert!(err.to_string().contains("no listener"));
    }

    #[tokio::test]
    async fn test_dial_without_listener_fails() {
        let network = MemoryGossipNetwork::new();
        let bob = network.create_gossip(PeerId::from_bytes(vec![0xb0]));
        let result = bob
            .dial_direct_channel(&ProvingKey::from_bytes(vec![1]))
            .await;
        assert!(result.is_err());
    }
}
