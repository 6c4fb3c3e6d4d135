//! Frame sync server: answers range requests with compressed payloads.
//!
//! Responses stream out in windows of at most 32 frames. A request starting
//! beyond anything the store knows gets exactly one empty payload and no
//! error; the peer learns there is nothing to fetch.

use async_trait::async_trait;
use tracing::{debug, info};

use clockmesh_core::CompressedSyncPayload;
use clockmesh_store::FrameStore;

use crate::error::Result;
use crate::messages::FrameRangeRequest;

/// Widest window one response may cover.
pub const MAX_FRAMES_PER_RESPONSE: u64 = 32;

/// Where response payloads go: a network stream in production, a buffer in
/// tests.
#[async_trait]
pub trait SyncFrameSink: Send {
    /// Emit one response payload. A failed send aborts the serve call.
    async fn send(&mut self, payload: CompressedSyncPayload) -> Result<()>;
}

/// Sink that collects payloads in memory.
#[derive(Default)]
pub struct BufferSink {
    /// Everything sent so far, in order.
    pub payloads: Vec<CompressedSyncPayload>,
}

impl BufferSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncFrameSink for BufferSink {
    async fn send(&mut self, payload: CompressedSyncPayload) -> Result<()> {
        self.payloads.push(payload);
        Ok(())
    }
}

/// Serve a compressed frame range request.
///
/// `latest_frame` bounds the walk; windows are clamped to
/// [`MAX_FRAMES_PER_RESPONSE`] frames whenever the requested `to` is zero,
/// precedes `from`, or spans too far. The emitted windows are consecutive
/// and non-overlapping.
pub async fn serve_compressed_sync_frames<F: FrameStore + ?Sized>(
    store: &F,
    latest_frame: u64,
    request: &FrameRangeRequest,
    sink: &mut impl SyncFrameSink,
) -> Result<()> {
    let mut from = request.from_frame_number;

    match store.get_frame(&request.filter, from).await {
        Ok(_) => {}
        Err(e) if e.is_not_found() => {
            debug!(
                filter = %request.filter.to_hex(),
                from,
                "sync request starts beyond known frames, answering empty"
            );
            sink.send(CompressedSyncPayload::empty(request.filter.clone()))
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    loop {
        let mut to = request.to_frame_number;
        if to == 0 || to < from || to - from >= MAX_FRAMES_PER_RESPONSE {
            to = (from + MAX_FRAMES_PER_RESPONSE - 1).min(latest_frame).max(from);
        }

        let payload = store
            .get_compressed_frame_range(&request.filter, from, to)
            .await?;
        info!(
            filter = %request.filter.to_hex(),
            from,
            to,
            frames = payload.truncated_frames.len(),
            "served compressed sync window"
        );
        sink.send(payload).await?;

        let requested_to = request.to_frame_number;
        if (requested_to == 0 || requested_to > to) && latest_frame > to {
            from = to + 1;
        } else {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockmesh_core::{ClockFrame, Filter, INPUT_HEADER_LEN};
    use clockmesh_store::MemoryFrameStore;

    fn filter() -> Filter {
        Filter::from_bytes(vec![0x0f])
    }

    fn store_with_frames(range: std::ops::RangeInclusive<u64>) -> MemoryFrameStore {
        let store = MemoryFrameStore::new();
        for n in range {
            store.put_frame(
                &filter(),
                ClockFrame {
                    frame_number: n,
                    input: vec![0u8; INPUT_HEADER_LEN],
                    aggregate_proofs: vec![],
                },
            );
        }
        store
    }

    #[tokio::test]
    async fn test_unknown_from_answers_single_empty() {
        let store = store_with_frames(1..=5);
        let mut sink = BufferSink::new();
        let request = FrameRangeRequest {
            filter: filter(),
            from_frame_number: 50,
            to_frame_number: 0,
        };
        serve_compressed_sync_frames(&store, 5, &request, &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.payloads.len(), 1);
        assert!(sink.payloads[0].is_empty());
    }

    #[tokio::test]
    async fn test_wide_range_paginates_without_gaps() {
        let store = store_with_frames(1..=80);
        let mut sink = BufferSink::new();
        let request = FrameRangeRequest {
            filter: filter(),
            from_frame_number: 1,
            to_frame_number: 0,
        };
        serve_compressed_sync_frames(&store, 80, &request, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.payloads.len(), 3);
        let mut expected_from = 1;
        for payload in &sink.payloads {
            assert_eq!(payload.from_frame_number, expected_from);
            assert!(payload.to_frame_number - payload.from_frame_number < MAX_FRAMES_PER_RESPONSE);
            expected_from = payload.to_frame_number + 1;
        }
        assert_eq!(sink.payloads.last().unwrap().to_frame_number, 80);
    }

    #[tokio::test]
    async fn test_bounded_request_stops_at_to() {
        let store = store_with_frames(1..=80);
        let mut sink = BufferSink::new();
        let request = FrameRangeRequest {
            filter: filter(),
            from_frame_number: 10,
            to_frame_number: 20,
        };
        serve_compressed_sync_frames(&store, 80, &request, &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.payloads.len(), 1);
        assert_eq!(sink.payloads[0].from_frame_number, 10);
        assert_eq!(sink.payloads[0].to_frame_number, 20);
    }

    #[tokio::test]
    async fn test_inverted_range_clamps_to_window() {
        let store = store_with_frames(1..=40);
        let mut sink = BufferSink::new();
        let request = FrameRangeRequest {
            filter: filter(),
            from_frame_number: 10,
            to_frame_number: 3,
        };
        serve_compressed_sync_frames(&store, 40, &request, &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.payloads.len(), 1);
        assert_eq!(sink.payloads[0].from_frame_number, 10);
        assert_eq!(sink.payloads[0].to_frame_number, 40);
    }
}
