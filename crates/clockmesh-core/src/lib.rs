//! Clockmesh core: clock frames, inclusion proofs, and sync compression.
//!
//! This crate holds the pure data model and algorithms shared by the rest of
//! the workspace. No I/O and no async: frames, proofs, and segments in;
//! compressed payloads and reconstructed frames out.

pub mod canonical;
pub mod compress;
pub mod error;
pub mod frame;
pub mod keys;
pub mod proofs;
pub mod types;

pub use canonical::{from_canonical_slice, to_canonical_vec};
pub use compress::{compress_frames, reconstruct_frame, CompressedSyncPayload, SegmentIndex};
pub use error::{CoreError, Result};
pub use frame::{ClockFrame, TruncatedClockFrame, COMMIT_RECORD_LEN, INPUT_HEADER_LEN};
pub use keys::{
    KeyBundleAnnouncement, ProvingKeyAnnouncement, ProvingKeyRequest,
    KEY_BUNDLE_ANNOUNCEMENT_TAG, PROVING_KEY_ANNOUNCEMENT_TAG, PROVING_KEY_REQUEST_TAG,
};
pub use proofs::{
    AggregateProofRecord, CommitmentEntry, InclusionAggregateProof, InclusionCommitment,
    IntrinsicExecutionOutput, INTRINSIC_EXECUTION_OUTPUT_TYPE_URL,
};
pub use types::{
    Filter, PeerId, ProvingKey, Segment, SegmentHash, CEREMONY_APPLICATION_ADDRESS,
};
