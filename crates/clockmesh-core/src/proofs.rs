//! Inclusion proofs and the compressed-sync proof records.
//!
//! Frames carry [`InclusionAggregateProof`]s; during sync those are stripped
//! and replaced by [`AggregateProofRecord`]s plus content-addressed segments,
//! from which the receiving side reconstructs the full proofs.

use serde::{Deserialize, Serialize};

use crate::canonical::{from_canonical_slice, to_canonical_vec};
use crate::error::CoreError;
use crate::types::{Filter, SegmentHash};

/// Type URL marking a commitment whose data is an intrinsic execution
/// output, reconstructed from two segments by the address/output/proof
/// split rather than plain concatenation.
pub const INTRINSIC_EXECUTION_OUTPUT_TYPE_URL: &str =
    "ceremony.application.IntrinsicExecutionOutput";

/// One commitment inside an aggregate proof record, referencing its data by
/// segment hash instead of carrying it inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentEntry {
    /// Identifies how the referenced segments reassemble into data.
    pub type_url: String,
    /// The commitment bytes.
    pub commitment: Vec<u8>,
    /// One or two segment hashes, in reassembly order.
    pub segment_hashes: Vec<SegmentHash>,
}

/// A deduplicated proof record in a compressed sync payload.
///
/// Matched against a frame's embedded 74-byte commit records by exact byte
/// comparison of `frame_commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateProofRecord {
    /// The 74-byte commit record this proof belongs to.
    pub frame_commit: Vec<u8>,
    /// The aggregate proof bytes.
    pub proof: Vec<u8>,
    /// Ordered commitments covered by this proof.
    pub commitments: Vec<CommitmentEntry>,
}

/// A fully reconstructed commitment, positioned within its aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionCommitment {
    pub filter: Filter,
    pub frame_number: u64,
    /// Index within the aggregate proof.
    pub position: u32,
    pub type_url: String,
    /// Reassembled data bytes.
    pub data: Vec<u8>,
    pub commitment: Vec<u8>,
}

/// A reconstructed aggregate proof, attached back onto its clock frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionAggregateProof {
    pub filter: Filter,
    pub frame_number: u64,
    pub inclusion_commitments: Vec<InclusionCommitment>,
    pub proof: Vec<u8>,
}

/// The two-segment reconstruction target: first segment splits into
/// `address` and `output`, the second segment is `proof` verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrinsicExecutionOutput {
    pub address: [u8; 32],
    pub output: Vec<u8>,
    pub proof: Vec<u8>,
}

impl IntrinsicExecutionOutput {
    /// Encode to canonical bytes for use as commitment data.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        to_canonical_vec(self)
    }

    /// Decode from canonical bytes.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        from_canonical_slice(bytes)
    }
}
