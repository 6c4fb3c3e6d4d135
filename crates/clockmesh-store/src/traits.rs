//! Store traits: the abstract interfaces for frame and key persistence.
//!
//! These keep the engine storage-agnostic. Implementations include the
//! in-memory stores in this crate (tests, embedding) and whatever durable
//! backend an integrator supplies.

use async_trait::async_trait;
use clockmesh_core::{
    ClockFrame, CompressedSyncPayload, Filter, ProvingKey, ProvingKeyAnnouncement,
};

use crate::error::Result;

/// Bookkeeping stored alongside a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMetadata {
    /// When the frame was stored (Unix ms).
    pub stored_at: i64,
}

/// A committed proving key as persisted by the key store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedKeyEntry {
    /// The key this entry is for.
    pub proving_key: ProvingKey,
    /// Canonical bytes of the committed announcement.
    pub data: Vec<u8>,
}

/// Async interface for clock frame persistence.
///
/// Absence of a frame is `StoreError::NotFound`, which callers treat as
/// expected (the sync server responds with an empty payload).
#[async_trait]
pub trait FrameStore: Send + Sync {
    /// Get a single frame with its metadata.
    async fn get_frame(&self, filter: &Filter, frame_number: u64)
        -> Result<(ClockFrame, FrameMetadata)>;

    /// Get a compressed payload covering `from..=to` for a filter.
    ///
    /// Frames missing from the middle of the range are skipped; the payload
    /// covers whatever the store has.
    async fn get_compressed_frame_range(
        &self,
        filter: &Filter,
        from: u64,
        to: u64,
    ) -> Result<CompressedSyncPayload>;

    /// Highest frame number stored for a filter, if any.
    async fn latest_frame_number(&self, filter: &Filter) -> Result<Option<u64>>;
}

/// Async interface for proving-key persistence.
///
/// Committed entries are keys that made it into a frame; staged entries are
/// announcements seen over gossip but not yet committed.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Look up a committed proving key.
    async fn get_proving_key(&self, key: &ProvingKey) -> Result<CommittedKeyEntry>;

    /// Look up a staged (announced but uncommitted) proving key.
    async fn get_staged_proving_key(&self, key: &ProvingKey) -> Result<ProvingKeyAnnouncement>;
}
