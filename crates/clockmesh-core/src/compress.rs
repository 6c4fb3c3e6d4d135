//! Compressed sync payloads: producing them from stored frames and
//! reconstructing full frames on the receiving side.
//!
//! Sync strips aggregate proofs from frames and ships the underlying data
//! once as content-addressed segments, deduplicated across the payload.
//! Reconstruction matches each frame's embedded 74-byte commit records
//! against the payload's proof records by exact bytes and reassembles
//! commitment data from the segment set.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoreError;
use crate::frame::{ClockFrame, TruncatedClockFrame, COMMIT_RECORD_LEN};
use crate::proofs::{
    AggregateProofRecord, CommitmentEntry, InclusionAggregateProof, InclusionCommitment,
    IntrinsicExecutionOutput, INTRINSIC_EXECUTION_OUTPUT_TYPE_URL,
};
use crate::types::{Filter, Segment, SegmentHash};

/// One response in a compressed frame sync stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedSyncPayload {
    /// Filter the frames belong to.
    pub filter: Filter,
    /// First frame number covered, inclusive.
    pub from_frame_number: u64,
    /// Last frame number covered, inclusive.
    pub to_frame_number: u64,
    /// Frames with their aggregate proofs stripped.
    pub truncated_frames: Vec<TruncatedClockFrame>,
    /// Proof records, deduplicated by `frame_commit`.
    pub proofs: Vec<AggregateProofRecord>,
    /// Content-addressed segments, deduplicated by hash.
    pub segments: Vec<Segment>,
}

impl CompressedSyncPayload {
    /// The sentinel response for a range the store knows nothing about:
    /// `{0, 0, []}`.
    pub fn empty(filter: Filter) -> Self {
        Self {
            filter,
            from_frame_number: 0,
            to_frame_number: 0,
            truncated_frames: Vec::new(),
            proofs: Vec::new(),
            segments: Vec::new(),
        }
    }

    /// True for the sentinel produced by [`CompressedSyncPayload::empty`].
    pub fn is_empty(&self) -> bool {
        self.from_frame_number == 0 && self.to_frame_number == 0 && self.truncated_frames.is_empty()
    }
}

/// Strict 1:1 hash-to-segment mapping over a payload's segment set.
///
/// First-match resolution would let a duplicate hash silently pick the wrong
/// bytes; instead, two segments under the same hash with different data are
/// a fatal payload fault, and byte-identical duplicates collapse.
pub struct SegmentIndex<'a> {
    by_hash: HashMap<SegmentHash, &'a [u8]>,
}

impl<'a> SegmentIndex<'a> {
    /// Build the index, rejecting conflicting segments.
    pub fn build(segments: &'a [Segment]) -> Result<Self, CoreError> {
        let mut by_hash: HashMap<SegmentHash, &'a [u8]> = HashMap::with_capacity(segments.len());
        for segment in segments {
            match by_hash.get(&segment.hash) {
                Some(existing) if *existing != segment.data.as_slice() => {
                    return Err(CoreError::SegmentConflict(segment.hash.to_hex()));
                }
                Some(_) => {}
                None => {
                    by_hash.insert(segment.hash, segment.data.as_slice());
                }
            }
        }
        Ok(Self { by_hash })
    }

    /// Look up segment data by hash.
    pub fn get(&self, hash: &SegmentHash) -> Option<&'a [u8]> {
        self.by_hash.get(hash).copied()
    }

    /// Number of distinct segments indexed.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// True when no segments are indexed.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

/// Compress a contiguous range of frames into one sync payload.
///
/// Each frame's aggregate proofs must line up one-to-one with its embedded
/// commit records. Proof records are deduplicated by `frame_commit` and
/// segments by content hash across the whole payload.
pub fn compress_frames(
    filter: &Filter,
    from: u64,
    to: u64,
    frames: &[ClockFrame],
) -> Result<CompressedSyncPayload, CoreError> {
    let mut truncated_frames = Vec::with_capacity(frames.len());
    let mut proofs: Vec<AggregateProofRecord> = Vec::new();
    let mut seen_commits: HashSet<Vec<u8>> = HashSet::new();
    let mut segments: Vec<Segment> = Vec::new();
    let mut seen_segments: HashSet<SegmentHash> = HashSet::new();

    for frame in frames {
        let records = frame.commit_records()?;
        if records.len() != frame.aggregate_proofs.len() {
            return Err(CoreError::CommitProofMismatch {
                frame_number: frame.frame_number,
                commits: records.len(),
                proofs: frame.aggregate_proofs.len(),
            });
        }

        for (record, aggregate) in records.iter().zip(&frame.aggregate_proofs) {
            if seen_commits.contains(*record) {
                continue;
            }

            let mut commitments = Vec::with_capacity(aggregate.inclusion_commitments.len());
            for commitment in &aggregate.inclusion_commitments {
                let parts = commitment_segments(commitment)?;
                let mut segment_hashes = Vec::with_capacity(parts.len());
                for data in parts {
                    let segment = Segment::new(data);
                    segment_hashes.push(segment.hash);
                    if seen_segments.insert(segment.hash) {
                        segments.push(segment);
                    }
                }
                commitments.push(CommitmentEntry {
                    type_url: commitment.type_url.clone(),
                    commitment: commitment.commitment.clone(),
                    segment_hashes,
                });
            }

            seen_commits.insert(record.to_vec());
            proofs.push(AggregateProofRecord {
                frame_commit: record.to_vec(),
                proof: aggregate.proof.clone(),
                commitments,
            });
        }

        truncated_frames.push(frame.truncate());
    }

    Ok(CompressedSyncPayload {
        filter: filter.clone(),
        from_frame_number: from,
        to_frame_number: to,
        truncated_frames,
        proofs,
        segments,
    })
}

/// Split a commitment's data into the segment byte strings it ships as.
///
/// Intrinsic execution outputs ship as two segments (`address ++ output`,
/// then `proof`); everything else ships its data as a single segment.
fn commitment_segments(commitment: &InclusionCommitment) -> Result<Vec<Vec<u8>>, CoreError> {
    if commitment.type_url == INTRINSIC_EXECUTION_OUTPUT_TYPE_URL {
        let output = IntrinsicExecutionOutput::from_canonical_bytes(&commitment.data)?;
        let mut first = Vec::with_capacity(32 + output.output.len());
        first.extend_from_slice(&output.address);
        first.extend_from_slice(&output.output);
        Ok(vec![first, output.proof])
    } else {
        Ok(vec![commitment.data.clone()])
    }
}

/// Reconstruct a full clock frame from its truncated wire form.
///
/// Every embedded commit record must match a proof record's `frame_commit`
/// exactly; a missing match is fatal for the payload. Missing segments are
/// tolerated: the affected portion of the commitment data is left empty and
/// downstream validation decides whether that matters.
pub fn reconstruct_frame(
    filter: &Filter,
    truncated: &TruncatedClockFrame,
    proofs: &[AggregateProofRecord],
    segments: &SegmentIndex<'_>,
) -> Result<ClockFrame, CoreError> {
    let records = truncated.commit_records()?;
    let mut aggregate_proofs = Vec::with_capacity(records.len());

    for (commit_index, record) in records.iter().enumerate() {
        let proof_record = proofs
            .iter()
            .find(|p| p.frame_commit.as_slice() == *record)
            .ok_or(CoreError::MissingProof {
                frame_number: truncated.frame_number,
                commit_index,
            })?;

        let mut inclusion_commitments = Vec::with_capacity(proof_record.commitments.len());
        for (position, entry) in proof_record.commitments.iter().enumerate() {
            let data = reassemble_commitment_data(
                truncated.frame_number,
                commit_index,
                entry,
                segments,
            )?;
            inclusion_commitments.push(InclusionCommitment {
                filter: filter.clone(),
                frame_number: truncated.frame_number,
                position: position as u32,
                type_url: entry.type_url.clone(),
                data,
                commitment: entry.commitment.clone(),
            });
        }

        aggregate_proofs.push(InclusionAggregateProof {
            filter: filter.clone(),
            frame_number: truncated.frame_number,
            inclusion_commitments,
            proof: proof_record.proof.clone(),
        });
    }

    Ok(ClockFrame {
        frame_number: truncated.frame_number,
        input: truncated.input.clone(),
        aggregate_proofs,
    })
}

fn reassemble_commitment_data(
    frame_number: u64,
    commit_index: usize,
    entry: &CommitmentEntry,
    segments: &SegmentIndex<'_>,
) -> Result<Vec<u8>, CoreError> {
    match entry.segment_hashes.len() {
        1 => {
            let hash = &entry.segment_hashes[0];
            match segments.get(hash) {
                Some(data) => Ok(data.to_vec()),
                None => {
                    warn!(
                        frame_number,
                        commit_index,
                        segment = %hash.to_hex(),
                        "segment missing from sync payload, commitment data left empty"
                    );
                    Ok(Vec::new())
                }
            }
        }
        2 if entry.type_url == INTRINSIC_EXECUTION_OUTPUT_TYPE_URL => {
            let mut address = [0u8; 32];
            let mut output = Vec::new();
            match segments.get(&entry.segment_hashes[0]) {
                Some(data) if data.len() >= 32 => {
                    address.copy_from_slice(&data[..32]);
                    output = data[32..].to_vec();
                }
                Some(data) => {
                    return Err(CoreError::MalformedInput(format!(
                        "intrinsic execution output segment is {} bytes, need at least 32",
                        data.len()
                    )));
                }
                None => {
                    warn!(
                        frame_number,
                        commit_index,
                        segment = %entry.segment_hashes[0].to_hex(),
                        "intrinsic output segment missing, address/output left empty"
                    );
                }
            }
            let proof = match segments.get(&entry.segment_hashes[1]) {
                Some(data) => data.to_vec(),
                None => {
                    warn!(
                        frame_number,
                        commit_index,
                        segment = %entry.segment_hashes[1].to_hex(),
                        "intrinsic proof segment missing, proof left empty"
                    );
                    Vec::new()
                }
            };
            IntrinsicExecutionOutput {
                address,
                output,
                proof,
            }
            .to_canonical_bytes()
        }
        2 => {
            let mut data = Vec::new();
            for hash in &entry.segment_hashes {
                match segments.get(hash) {
                    Some(part) => data.extend_from_slice(part),
                    None => {
                        warn!(
                            frame_number,
                            commit_index,
                            segment = %hash.to_hex(),
                            "segment missing from sync payload, portion left empty"
                        );
                    }
                }
            }
            Ok(data)
        }
        n => Err(CoreError::MalformedInput(format!(
            "commitment references {} segments, expected 1 or 2",
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::INPUT_HEADER_LEN;
    use proptest::prelude::*;

    fn input_with_commits(commits: &[[u8; COMMIT_RECORD_LEN]]) -> Vec<u8> {
        let mut input = vec![0x42u8; INPUT_HEADER_LEN];
        for c in commits {
            input.extend_from_slice(c);
        }
        input
    }

    fn filter() -> Filter {
        Filter::from_bytes(vec![0xf0, 0x0d])
    }

    fn proof_bytes() -> Vec<u8> {
        vec![0xab, 0xcd]
    }

    #[test]
    fn test_concrete_single_segment_scenario() {
        let c1 = [0x01u8; COMMIT_RECORD_LEN];
        let truncated = TruncatedClockFrame {
            frame_number: 5,
            input: input_with_commits(&[c1]),
        };
        let segment = Segment::new(b"abcdef".to_vec());
        let proofs = vec![AggregateProofRecord {
            frame_commit: c1.to_vec(),
            proof: proof_bytes(),
            commitments: vec![CommitmentEntry {
                type_url: "X".into(),
                commitment: vec![0xcc],
                segment_hashes: vec![segment.hash],
            }],
        }];
        let segments = vec![segment];
        let index = SegmentIndex::build(&segments).unwrap();

        let frame = reconstruct_frame(&filter(), &truncated, &proofs, &index).unwrap();
        assert_eq!(frame.aggregate_proofs.len(), 1);
        let aggregate = &frame.aggregate_proofs[0];
        assert_eq!(aggregate.inclusion_commitments.len(), 1);
        let commitment = &aggregate.inclusion_commitments[0];
        assert_eq!(commitment.position, 0);
        assert_eq!(commitment.data, b"abcdef");
    }

    #[test]
    fn test_missing_proof_is_fatal() {
        let c1 = [0x02u8; COMMIT_RECORD_LEN];
        let truncated = TruncatedClockFrame {
            frame_number: 9,
            input: input_with_commits(&[c1]),
        };
        let index = SegmentIndex::build(&[]).unwrap();
        let result = reconstruct_frame(&filter(), &truncated, &[], &index);
        assert!(matches!(
            result,
            Err(CoreError::MissingProof {
                frame_number: 9,
                commit_index: 0
            })
        ));
    }

    #[test]
    fn test_segment_conflict_rejected() {
        let good = Segment::new(b"hello".to_vec());
        let mut forged = Segment::new(b"world".to_vec());
        forged.hash = good.hash;
        let segments = [good, forged];
        let result = SegmentIndex::build(&segments);
        assert!(matches!(result, Err(CoreError::SegmentConflict(_))));
    }

    #[test]
    fn test_duplicate_identical_segments_collapse() {
        let a = Segment::new(b"same".to_vec());
        let b = Segment::new(b"same".to_vec());
        let segments = [a, b];
        let index = SegmentIndex::build(&segments).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_missing_segment_tolerated() {
        let c1 = [0x03u8; COMMIT_RECORD_LEN];
        let truncated = TruncatedClockFrame {
            frame_number: 2,
            input: input_with_commits(&[c1]),
        };
        let proofs = vec![AggregateProofRecord {
            frame_commit: c1.to_vec(),
            proof: proof_bytes(),
            commitments: vec![CommitmentEntry {
                type_url: "X".into(),
                commitment: vec![],
                segment_hashes: vec![SegmentHash::of(b"never shipped")],
            }],
        }];
        let index = SegmentIndex::build(&[]).unwrap();
        let frame = reconstruct_frame(&filter(), &truncated, &proofs, &index).unwrap();
        assert!(frame.aggregate_proofs[0].inclusion_commitments[0]
            .data
            .is_empty());
    }

    #[test]
    fn test_dual_segment_concatenation_order() {
        let c1 = [0x06u8; COMMIT_RECORD_LEN];
        let truncated = TruncatedClockFrame {
            frame_number: 6,
            input: input_with_commits(&[c1]),
        };
        let first = Segment::new(b"left".to_vec());
        let second = Segment::new(b"right".to_vec());
        let proofs = vec![AggregateProofRecord {
            frame_commit: c1.to_vec(),
            proof: proof_bytes(),
            commitments: vec![CommitmentEntry {
                type_url: "X".into(),
                commitment: vec![0xdd],
                segment_hashes: vec![first.hash, second.hash],
            }],
        }];
        // Segment storage order must not matter, only the hash order in
        // the commitment entry.
        let segments = vec![second, first];
        let index = SegmentIndex::build(&segments).unwrap();

        let frame = reconstruct_frame(&filter(), &truncated, &proofs, &index).unwrap();
        let commitment = &frame.aggregate_proofs[0].inclusion_commitments[0];
        assert_eq!(commitment.data, b"leftright");
    }

    #[test]
    fn test_dual_segment_missing_part_tolerated() {
        let c1 = [0x07u8; COMMIT_RECORD_LEN];
        let truncated = TruncatedClockFrame {
            frame_number: 7,
            input: input_with_commits(&[c1]),
        };
        let first = Segment::new(b"left".to_vec());
        let missing = SegmentHash::of(b"never shipped");
        let proofs = vec![AggregateProofRecord {
            frame_commit: c1.to_vec(),
            proof: proof_bytes(),
            commitments: vec![CommitmentEntry {
                type_url: "X".into(),
                commitment: vec![0xee],
                segment_hashes: vec![first.hash, missing],
            }],
        }];
        let segments = vec![first];
        let index = SegmentIndex::build(&segments).unwrap();

        let frame = reconstruct_frame(&filter(), &truncated, &proofs, &index).unwrap();
        let commitment = &frame.aggregate_proofs[0].inclusion_commitments[0];
        assert_eq!(commitment.data, b"left");
    }

    #[test]
    fn test_intrinsic_short_first_segment_rejected() {
        let c1 = [0x04u8; COMMIT_RECORD_LEN];
        let truncated = TruncatedClockFrame {
            frame_number: 3,
            input: input_with_commits(&[c1]),
        };
        let short = Segment::new(vec![0u8; 16]);
        let proof_seg = Segment::new(b"proof".to_vec());
        let proofs = vec![AggregateProofRecord {
            frame_commit: c1.to_vec(),
            proof: proof_bytes(),
            commitments: vec![CommitmentEntry {
                type_url: INTRINSIC_EXECUTION_OUTPUT_TYPE_URL.into(),
                commitment: vec![],
                segment_hashes: vec![short.hash, proof_seg.hash],
            }],
        }];
        let segments = vec![short, proof_seg];
        let index = SegmentIndex::build(&segments).unwrap();
        let result = reconstruct_frame(&filter(), &truncated, &proofs, &index);
        assert!(matches!(result, Err(CoreError::MalformedInput(_))));
    }

    fn frame_with_commitments(
        frame_number: u64,
        commitments: Vec<InclusionCommitment>,
    ) -> ClockFrame {
        let mut commit = [0u8; COMMIT_RECORD_LEN];
        commit[..8].copy_from_slice(&frame_number.to_be_bytes());
        ClockFrame {
            frame_number,
            input: input_with_commits(&[commit]),
            aggregate_proofs: vec![InclusionAggregateProof {
                filter: filter(),
                frame_number,
                inclusion_commitments: commitments,
                proof: proof_bytes(),
            }],
        }
    }

    fn roundtrip(frames: &[ClockFrame]) -> Vec<ClockFrame> {
        let from = frames.first().map(|f| f.frame_number).unwrap_or(0);
        let to = frames.last().map(|f| f.frame_number).unwrap_or(0);
        let payload = compress_frames(&filter(), from, to, frames).unwrap();
        let index = SegmentIndex::build(&payload.segments).unwrap();
        payload
            .truncated_frames
            .iter()
            .map(|t| reconstruct_frame(&filter(), t, &payload.proofs, &index).unwrap())
            .collect()
    }

    #[test]
    fn test_roundtrip_single_and_intrinsic() {
        let intrinsic = IntrinsicExecutionOutput {
            address: [0x55; 32],
            output: vec![1, 2, 3],
            proof: vec![4, 5, 6],
        };
        let frames = vec![
            frame_with_commitments(
                10,
                vec![InclusionCommitment {
                    filter: filter(),
                    frame_number: 10,
                    position: 0,
                    type_url: "X".into(),
                    data: b"payload bytes".to_vec(),
                    commitment: vec![0x01],
                }],
            ),
            frame_with_commitments(
                11,
                vec![InclusionCommitment {
                    filter: filter(),
                    frame_number: 11,
                    position: 0,
                    type_url: INTRINSIC_EXECUTION_OUTPUT_TYPE_URL.into(),
                    data: intrinsic.to_canonical_bytes().unwrap(),
                    commitment: vec![0x02],
                }],
            ),
        ];
        let rebuilt = roundtrip(&frames);
        assert_eq!(rebuilt, frames);
    }

    #[test]
    fn test_commit_proof_count_mismatch() {
        let mut frame = frame_with_commitments(4, vec![]);
        frame.aggregate_proofs.clear();
        let result = compress_frames(&filter(), 4, 4, &[frame]);
        assert!(matches!(
            result,
            Err(CoreError::CommitProofMismatch {
                frame_number: 4,
                commits: 1,
                proofs: 0
            })
        ));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_preserves_proofs(
            payloads in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 1..64),
                1..4,
            )
        ) {
            let commitments = payloads
                .iter()
                .enumerate()
                .map(|(i, data)| InclusionCommitment {
                    filter: filter(),
                    frame_number: 21,
                    position: i as u32,
                    type_url: "X".into(),
                    data: data.clone(),
                    commitment: vec![i as u8],
                })
                .collect();
            let frame = frame_with_commitments(21, commitments);
            let rebuilt = roundtrip(std::slice::from_ref(&frame));
            prop_assert_eq!(rebuilt, vec![frame]);
        }
    }
}
