//! The consensus engine: gossip dispatch, frame sync, key serving.
//!
//! The engine ties the stores, the gossip substrate, and the application
//! collaborators together. It subscribes itself as a gossip handler via a
//! weak self-reference, so dropping the engine also retires its
//! subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use clockmesh_core::{
    from_canonical_slice, reconstruct_frame, CompressedSyncPayload, Filter, PeerId, ProvingKey,
    ProvingKeyAnnouncement, ProvingKeyRequest, SegmentIndex, CEREMONY_APPLICATION_ADDRESS,
    PROVING_KEY_ANNOUNCEMENT_TAG,
};
use clockmesh_store::{FrameStore, KeyStore};
use clockmesh_sync::{
    open_public_channel, serve_compressed_sync_frames, ChannelConfig, Envelope, FrameRangeRequest,
    GossipHandler, GossipMessage, GossipSubstrate, KnownPayload, PublicChannel, Result, SyncError,
    SyncFrameSink, TaggedPayload,
};

use crate::handlers::{FrameIngest, KeyEventHandler};

/// Configuration for the engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Direct channel establishment tunables.
    pub channel: ChannelConfig,
}

/// The Clockmesh consensus engine.
///
/// Generic over the frame store, key store, gossip substrate, and the
/// application object implementing both boundary traits.
pub struct ConsensusEngine<F, K, G, A>
where
    F: FrameStore + 'static,
    K: KeyStore + 'static,
    G: GossipSubstrate + 'static,
    A: FrameIngest + KeyEventHandler + 'static,
{
    filter: Filter,
    frame_store: Arc<F>,
    key_store: Arc<K>,
    gossip: Arc<G>,
    app: Arc<A>,
    config: EngineConfig,
    /// Highest frame number known to the engine. Read-mostly; updated only
    /// through `set_latest_frame` / `refresh_latest_frame`.
    latest_frame: AtomicU64,
    /// The peer currently being synced from, if any.
    syncing_target: RwLock<Option<PeerId>>,
    this: Weak<Self>,
}

impl<F, K, G, A> ConsensusEngine<F, K, G, A>
where
    F: FrameStore + 'static,
    K: KeyStore + 'static,
    G: GossipSubstrate + 'static,
    A: FrameIngest + KeyEventHandler + 'static,
{
    /// Create a new engine.
    pub fn new(
        filter: Filter,
        frame_store: Arc<F>,
        key_store: Arc<K>,
        gossip: Arc<G>,
        app: Arc<A>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            filter,
            frame_store,
            key_store,
            gossip,
            app,
            config,
            latest_frame: AtomicU64::new(0),
            syncing_target: RwLock::new(None),
            this: this.clone(),
        })
    }

    /// The filter this engine participates in.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Highest frame number the engine currently knows about.
    pub fn latest_frame(&self) -> u64 {
        self.latest_frame.load(Ordering::Acquire)
    }

    /// Record a new latest frame number.
    pub fn set_latest_frame(&self, frame_number: u64) {
        self.latest_frame.store(frame_number, Ordering::Release);
    }

    /// Pull the store's latest frame number into the engine context.
    pub async fn refresh_latest_frame(&self) -> Result<u64> {
        let latest = self
            .frame_store
            .latest_frame_number(&self.filter)
            .await?
            .unwrap_or(0);
        self.latest_frame.store(latest, Ordering::Release);
        Ok(latest)
    }

    /// Set or clear the peer frames are currently being synced from.
    pub fn set_syncing_target(&self, target: Option<PeerId>) {
        *self.syncing_target.write().unwrap() = target;
    }

    /// The current sync target, if any.
    pub fn syncing_target(&self) -> Option<PeerId> {
        self.syncing_target.read().unwrap().clone()
    }

    /// Join the mesh: refresh the frame context and subscribe to the filter
    /// topic for live gossip.
    pub async fn join(&self) -> Result<()> {
        let latest = self.refresh_latest_frame().await?;
        self.gossip
            .subscribe(self.filter.as_bytes().to_vec(), self.subscriber(), false)
            .await?;
        info!(
            filter = %self.filter.to_hex(),
            latest_frame = latest,
            "joined mesh"
        );
        Ok(())
    }

    /// Handle one gossip message addressed to this engine's filter.
    ///
    /// Self-originated messages are discarded before any decoding. Decode
    /// failures and handler errors come back as suppressed-class errors:
    /// the substrate logs them and keeps delivering.
    pub async fn handle_sync(&self, message: GossipMessage) -> Result<()> {
        debug!(from = %message.from, bytes = message.data.len(), "received sync message");
        if message.from == self.gossip.local_peer_id() {
            return Ok(());
        }

        let envelope = Envelope::decode(&message.data)?;
        match envelope.payload.classify()? {
            KnownPayload::ProvingKeyAnnouncement(announcement) => self
                .app
                .on_proving_key_announcement(message.from, announcement)
                .await
                .map_err(|e| SyncError::Handler(e.to_string())),
            KnownPayload::KeyBundleAnnouncement(announcement) => self
                .app
                .on_key_bundle_announcement(message.from, announcement)
                .await
                .map_err(|e| SyncError::Handler(e.to_string())),
            KnownPayload::ProvingKeyRequest(request) => {
                self.handle_proving_key_request(message.from, request).await
            }
            KnownPayload::Unknown(tag) => {
                debug!(tag, "ignoring payload with unknown type tag");
                Ok(())
            }
        }
    }

    /// Answer a peer's proving-key request on a peer-scoped reply topic.
    ///
    /// Requests from ourselves and requests naming an empty key are dropped
    /// before any store lookup. Lookup misses are dropped silently; the
    /// requester retries elsewhere. The final publish is best-effort.
    pub async fn handle_proving_key_request(
        &self,
        peer: PeerId,
        request: ProvingKeyRequest,
    ) -> Result<()> {
        if peer == self.gossip.local_peer_id() {
            return Ok(());
        }
        if request.proving_key.is_empty() {
            debug!(from = %peer, "dropping proving key request with empty key");
            return Ok(());
        }

        let reply_topic = self.filter.reply_topic(&peer);
        self.gossip
            .subscribe(reply_topic.clone(), self.subscriber(), false)
            .await?;

        let announcement = match self.resolve_announcement(&request.proving_key).await {
            Some(a) => a,
            None => return Ok(()),
        };

        let envelope = Envelope {
            address: CEREMONY_APPLICATION_ADDRESS.to_vec(),
            payload: TaggedPayload::pack(PROVING_KEY_ANNOUNCEMENT_TAG, &announcement)?,
        };
        let bytes = envelope.encode()?;
        if let Err(e) = self.gossip.publish(reply_topic, bytes).await {
            warn!(to = %peer, error = %e, "proving key reply publish failed");
        }
        Ok(())
    }

    /// Committed entry first, then the staged announcement.
    async fn resolve_announcement(&self, key: &ProvingKey) -> Option<ProvingKeyAnnouncement> {
        match self.key_store.get_proving_key(key).await {
            Ok(entry) => match from_canonical_slice::<ProvingKeyAnnouncement>(&entry.data) {
                Ok(announcement) => return Some(announcement),
                Err(e) => {
                    debug!(key = %key.to_hex(), error = %e, "committed key entry failed to decode");
                    return None;
                }
            },
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                debug!(key = %key.to_hex(), error = %e, "committed key lookup failed");
                return None;
            }
        }
        match self.key_store.get_staged_proving_key(key).await {
            Ok(announcement) => Some(announcement),
            Err(e) => {
                debug!(key = %key.to_hex(), error = %e, "no staged key either, dropping request");
                None
            }
        }
    }

    /// Serve a compressed sync frame range to a requesting peer.
    pub async fn get_compressed_sync_frames(
        &self,
        request: &FrameRangeRequest,
        sink: &mut impl SyncFrameSink,
    ) -> Result<()> {
        serve_compressed_sync_frames(
            self.frame_store.as_ref(),
            self.latest_frame(),
            request,
            sink,
        )
        .await
    }

    /// Decompress a sync payload and hand every reconstructed frame to the
    /// application layer as a historical candidate.
    ///
    /// Any fatal payload fault (segment conflict, missing proof, malformed
    /// input) aborts the remainder of the payload.
    pub async fn decompress_and_store_candidates(
        &self,
        payload: &CompressedSyncPayload,
    ) -> Result<()> {
        let index = SegmentIndex::build(&payload.segments)?;
        let source = self.syncing_target();

        for truncated in &payload.truncated_frames {
            let frame = reconstruct_frame(&payload.filter, truncated, &payload.proofs, &index)?;
            debug!(
                frame_number = frame.frame_number,
                commits = frame.aggregate_proofs.len(),
                "reconstructed candidate frame"
            );
            self.app
                .ingest_frame(
                    source.clone(),
                    CEREMONY_APPLICATION_ADDRESS,
                    frame,
                    true,
                )
                .await
                .map_err(|e| SyncError::Ingest(e.to_string()))?;
        }

        info!(
            from = payload.from_frame_number,
            to = payload.to_frame_number,
            frames = payload.truncated_frames.len(),
            "stored candidate frames from sync payload"
        );
        Ok(())
    }

    /// Establish a direct channel with the peer holding a proving key.
    pub async fn get_public_channel_for_proving_key(
        &self,
        initiator: bool,
        proving_key: &ProvingKey,
    ) -> Result<Option<PublicChannel>> {
        open_public_channel(
            Arc::clone(&self.gossip),
            &self.config.channel,
            initiator,
            proving_key,
        )
        .await
    }

    /// A gossip handler forwarding into this engine.
    fn subscriber(&self) -> Arc<dyn GossipHandler> {
        Arc::new(EngineSubscriber {
            engine: self.this.clone(),
        })
    }
}

/// Gossip handler holding a weak reference back to the engine.
struct EngineSubscriber<F, K, G, A>
where
    F: FrameStore + 'static,
    K: KeyStore + 'static,
    G: GossipSubstrate + 'static,
    A: FrameIngest + KeyEventHandler + 'static,
{
    engine: Weak<ConsensusEngine<F, K, G, A>>,
}

#[async_trait]
impl<F, K, G, A> GossipHandler for EngineSubscriber<F, K, G, A>
where
    F: FrameStore + 'static,
    K: KeyStore + 'static,
    G: GossipSubstrate + 'static,
    A: FrameIngest + KeyEventHandler + 'static,
{
    async fn on_message(&self, message: GossipMessage) -> Result<()> {
        match self.engine.upgrade() {
            Some(engine) => engine.handle_sync(message).await,
            None => Ok(()),
        }
    }
}
