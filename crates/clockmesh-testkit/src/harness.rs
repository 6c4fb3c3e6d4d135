//! Recording doubles for the engine's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use clockmesh::{FrameIngest, KeyEventHandler};
use clockmesh_core::{
    ClockFrame, KeyBundleAnnouncement, PeerId, ProvingKey, ProvingKeyAnnouncement,
};
use clockmesh_store::{CommittedKeyEntry, KeyStore, Result as StoreResult};
use clockmesh_sync::SyncError;

/// One frame as handed across the ingestion boundary.
#[derive(Debug, Clone)]
pub struct IngestedFrame {
    pub source_peer: Option<PeerId>,
    pub application_address: [u8; 32],
    pub frame: ClockFrame,
    pub is_historical: bool,
}

/// Application double that records everything the engine hands it.
#[derive(Default)]
pub struct RecordingApplication {
    /// Frames received through [`FrameIngest`].
    pub ingested: Mutex<Vec<IngestedFrame>>,
    /// Proving key announcements received.
    pub key_announcements: Mutex<Vec<(PeerId, ProvingKeyAnnouncement)>>,
    /// Key bundle announcements received.
    pub bundle_announcements: Mutex<Vec<(PeerId, KeyBundleAnnouncement)>>,
}

impl RecordingApplication {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame numbers ingested so far, in order.
    pub fn ingested_frame_numbers(&self) -> Vec<u64> {
        self.ingested
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.frame.frame_number)
            .collect()
    }
}

#[async_trait]
impl FrameIngest for RecordingApplication {
    async fn ingest_frame(
        &self,
        source_peer: Option<PeerId>,
        application_address: [u8; 32],
        frame: ClockFrame,
        is_historical: bool,
    ) -> Result<(), SyncError> {
        self.ingested.lock().unwrap().push(IngestedFrame {
            source_peer,
            application_address,
            frame,
            is_historical,
        });
        Ok(())
    }
}

#[async_trait]
impl KeyEventHandler for RecordingApplication {
    async fn on_proving_key_announcement(
        &self,
        from: PeerId,
        announcement: ProvingKeyAnnouncement,
    ) -> Result<(), SyncError> {
        self.key_announcements
            .lock()
            .unwrap()
            .push((from, announcement));
        Ok(())
    }

    async fn on_key_bundle_announcement(
        &self,
        from: PeerId,
        announcement: KeyBundleAnnouncement,
    ) -> Result<(), SyncError> {
        self.bundle_announcements
            .lock()
            .unwrap()
            .push((from, announcement));
        Ok(())
    }
}

/// Key store wrapper counting lookups, for asserting that a handler did or
/// did not touch the store.
pub struct CountingKeyStore<K: KeyStore> {
    inner: K,
    lookups: AtomicUsize,
}

impl<K: KeyStore> CountingKeyStore<K> {
    /// Wrap a key store.
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Total lookups (committed + staged) so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<K: KeyStore> KeyStore for CountingKeyStore<K> {
    async fn get_proving_key(&self, key: &ProvingKey) -> StoreResult<CommittedKeyEntry> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_proving_key(key).await
    }

    async fn get_staged_proving_key(
        &self,
        key: &ProvingKey,
    ) -> StoreResult<ProvingKeyAnnouncement> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_staged_proving_key(key).await
    }
}
