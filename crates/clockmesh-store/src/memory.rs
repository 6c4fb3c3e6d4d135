//! In-memory implementations of the store traits.
//!
//! Primarily for tests. Same semantics as a durable backend would have,
//! but everything lives in RwLock-protected maps.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use clockmesh_core::{
    compress_frames, ClockFrame, CompressedSyncPayload, Filter, ProvingKey,
    ProvingKeyAnnouncement,
};

use crate::error::{Result, StoreError};
use crate::traits::{CommittedKeyEntry, FrameMetadata, FrameStore, KeyStore};

/// In-memory frame store.
///
/// Frames are kept per filter in a BTreeMap ordered by frame number, so
/// range reads come out in order. Thread-safe via RwLock.
pub struct MemoryFrameStore {
    inner: RwLock<MemoryFrameStoreInner>,
}

struct MemoryFrameStoreInner {
    /// Frames per filter, ordered by frame number.
    frames: HashMap<Filter, BTreeMap<u64, StoredFrame>>,
}

struct StoredFrame {
    frame: ClockFrame,
    stored_at: i64,
}

impl MemoryFrameStore {
    /// Create a new empty frame store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryFrameStoreInner {
                frames: HashMap::new(),
            }),
        }
    }

    /// Insert a frame. Replaces any existing frame at the same number.
    pub fn put_frame(&self, filter: &Filter, frame: ClockFrame) {
        let mut inner = self.inner.write().unwrap();
        inner.frames.entry(filter.clone()).or_default().insert(
            frame.frame_number,
            StoredFrame {
                frame,
                stored_at: now_millis(),
            },
        );
    }

    /// Number of frames stored for a filter.
    pub fn frame_count(&self, filter: &Filter) -> usize {
        let inner = self.inner.read().unwrap();
        inner.frames.get(filter).map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for MemoryFrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameStore for MemoryFrameStore {
    async fn get_frame(
        &self,
        filter: &Filter,
        frame_number: u64,
    ) -> Result<(ClockFrame, FrameMetadata)> {
        let inner = self.inner.read().unwrap();
        inner
            .frames
            .get(filter)
            .and_then(|m| m.get(&frame_number))
            .map(|s| {
                (
                    s.frame.clone(),
                    FrameMetadata {
                        stored_at: s.stored_at,
                    },
                )
            })
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "frame {} under filter {}",
                    frame_number,
                    filter.to_hex()
                ))
            })
    }

    async fn get_compressed_frame_range(
        &self,
        filter: &Filter,
        from: u64,
        to: u64,
    ) -> Result<CompressedSyncPayload> {
        let frames: Vec<ClockFrame> = {
            let inner = self.inner.read().unwrap();
            let by_number = inner.frames.get(filter).ok_or_else(|| {
                StoreError::NotFound(format!("no frames under filter {}", filter.to_hex()))
            })?;
            by_number
                .range(from..=to)
                .map(|(_, s)| s.frame.clone())
                .collect()
        };
        if frames.is_empty() {
            return Err(StoreError::NotFound(format!(
                "no frames in [{}, {}] under filter {}",
                from,
                to,
                filter.to_hex()
            )));
        }
        Ok(compress_frames(filter, from, to, &frames)?)
    }

    async fn latest_frame_number(&self, filter: &Filter) -> Result<Option<u64>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .frames
            .get(filter)
            .and_then(|m| m.keys().next_back().copied()))
    }
}

/// In-memory key store with separate committed and staged maps.
pub struct MemoryKeyStore {
    inner: RwLock<MemoryKeyStoreInner>,
}

struct MemoryKeyStoreInner {
    committed: HashMap<ProvingKey, CommittedKeyEntry>,
    staged: HashMap<ProvingKey, ProvingKeyAnnouncement>,
}

impl MemoryKeyStore {
    /// Create a new empty key store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryKeyStoreInner {
                committed: HashMap::new(),
                staged: HashMap::new(),
            }),
        }
    }

    /// Insert a committed key entry.
    pub fn put_committed(&self, entry: CommittedKeyEntry) {
        let mut inner = self.inner.write().unwrap();
        inner.committed.insert(entry.proving_key.clone(), entry);
    }

    /// Insert a staged announcement.
    pub fn put_staged(&self, announcement: ProvingKeyAnnouncement) {
        let mut inner = self.inner.write().unwrap();
        inner
            .staged
            .insert(announcement.proving_key.clone(), announcement);
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get_proving_key(&self, key: &ProvingKey) -> Result<CommittedKeyEntry> {
        let inner = self.inner.read().unwrap();
        inner
            .committed
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("committed key {}", key.to_hex())))
    }

    async fn get_staged_proving_key(&self, key: &ProvingKey) -> Result<ProvingKeyAnnouncement> {
        let inner = self.inner.read().unwrap();
        inner
            .staged
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("staged key {}", key.to_hex())))
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockmesh_core::INPUT_HEADER_LEN;

    fn filter() -> Filter {
        Filter::from_bytes(vec![1, 2, 3])
    }

    fn bare_frame(frame_number: u64) -> ClockFrame {
        ClockFrame {
            frame_number,
            input: vec![0u8; INPUT_HEADER_LEN],
            aggregate_proofs: vec![],
        }
    }

    #[tokio::test]
    async fn test_frame_store_get_and_latest() {
        let store = MemoryFrameStore::new();
        store.put_frame(&filter(), bare_frame(1));
        store.put_frame(&filter(), bare_frame(3));

        let (frame, meta) = store.get_frame(&filter(), 3).await.unwrap();
        assert_eq!(frame.frame_number, 3);
        assert!(meta.stored_at > 0);

        assert_eq!(store.latest_frame_number(&filter()).await.unwrap(), Some(3));
        assert_eq!(
            store
                .latest_frame_number(&Filter::from_bytes(vec![9]))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_frame_store_missing_is_not_found() {
        let store = MemoryFrameStore::new();
        let err = store.get_frame(&filter(), 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_compressed_range_skips_gaps() {
        let store = MemoryFrameStore::new();
        store.put_frame(&filter(), bare_frame(1));
        store.put_frame(&filter(), bare_frame(2));
        store.put_frame(&filter(), bare_frame(5));

        let payload = store
            .get_compressed_frame_range(&filter(), 1, 5)
            .await
            .unwrap();
        assert_eq!(payload.from_frame_number, 1);
        assert_eq!(payload.to_frame_number, 5);
        let numbers: Vec<u64> = payload
            .truncated_frames
            .iter()
            .map(|f| f.frame_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn test_key_store_committed_and_staged() {
        let store = MemoryKeyStore::new();
        let key = ProvingKey::from_bytes(vec![0xaa; 8]);

        assert!(store.get_proving_key(&key).await.unwrap_err().is_not_found());

        store.put_staged(ProvingKeyAnnouncement {
            proving_key: key.clone(),
            identity_commitment: vec![1],
            signature: vec![2],
        });
        let staged = store.get_staged_proving_key(&key).await.unwrap();
        assert_eq!(staged.proving_key, key);

        store.put_committed(CommittedKeyEntry {
            proving_key: key.clone(),
            data: vec![7, 7, 7],
        });
        let committed = store.get_proving_key(&key).await.unwrap();
        assert_eq!(committed.data, vec![7, 7, 7]);
    }
}
