//! Error types for the sync module.
//!
//! Protocol handlers distinguish two classes of failure: suppressed errors
//! (malformed peer input, expected absences) are logged and the handler
//! moves on; fatal errors abort the operation they occurred in. The split is
//! explicit in [`SyncError::class`] so call sites stay auditable.

use thiserror::Error;

use clockmesh_core::CoreError;
use clockmesh_store::StoreError;

/// Errors that can occur during sync and peer messaging operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A peer's bytes failed to decode. Routine Byzantine input.
    #[error("decode error: {0}")]
    Decode(String),

    /// A sync payload is internally inconsistent.
    #[error("invalid data: {0}")]
    InvalidData(#[from] CoreError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Substrate-level publish/subscribe/dial failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A deadline elapsed while waiting on a peer.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The application layer rejected an ingested frame.
    #[error("frame ingestion failed: {0}")]
    Ingest(String),

    /// A key event handler failed.
    #[error("handler error: {0}")]
    Handler(String),
}

/// How a handler should react to a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Log and continue; the peer's loss, not ours.
    Suppressed,
    /// Abort the current operation.
    Fatal,
}

impl SyncError {
    /// Classify this error for dispatch-loop handling.
    pub fn class(&self) -> ErrorClass {
        match self {
            SyncError::Decode(_) | SyncError::Handler(_) => ErrorClass::Suppressed,
            SyncError::Store(e) if e.is_not_found() => ErrorClass::Suppressed,
            SyncError::InvalidData(_)
            | SyncError::Store(_)
            | SyncError::Transport(_)
            | SyncError::Timeout(_)
            | SyncError::Ingest(_) => ErrorClass::Fatal,
        }
    }

    /// True when the underlying cause is an expected store absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_not_found())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            SyncError::Decode("bad cbor".into()).class(),
            ErrorClass::Suppressed
        );
        assert_eq!(
            SyncError::Store(StoreError::NotFound("frame 4".into())).class(),
            ErrorClass::Suppressed
        );
        assert_eq!(
            SyncError::Store(StoreError::InvalidData("corrupt".into())).class(),
            ErrorClass::Fatal
        );
        assert_eq!(
            SyncError::Timeout("channel".into()).class(),
            ErrorClass::Fatal
        );
    }
}
