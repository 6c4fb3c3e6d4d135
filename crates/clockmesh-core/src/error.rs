//! Error types for the Clockmesh core.

use thiserror::Error;

/// Core errors that can occur while handling frames and sync payloads.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Frame input bytes do not follow the header + commit-record layout.
    #[error("malformed frame input: {0}")]
    MalformedInput(String),

    /// A commit record has no matching aggregate proof in the payload.
    ///
    /// A compressed sync payload must be internally self-consistent; this
    /// is a fatal fault for the whole payload.
    #[error("no aggregate proof matches commit {commit_index} of frame {frame_number}")]
    MissingProof {
        frame_number: u64,
        commit_index: usize,
    },

    /// Two different segments were supplied under the same hash.
    #[error("conflicting segment data for hash {0}")]
    SegmentConflict(String),

    /// A frame's aggregate proofs do not line up with its commit records.
    #[error(
        "frame {frame_number} has {commits} commit records but {proofs} aggregate proofs"
    )]
    CommitProofMismatch {
        frame_number: u64,
        commits: usize,
        proofs: usize,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
