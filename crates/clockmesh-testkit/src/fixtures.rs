//! Frame and payload fixtures for tests.

use clockmesh_core::{
    ClockFrame, Filter, InclusionAggregateProof, InclusionCommitment, IntrinsicExecutionOutput,
    PeerId, ProvingKey, COMMIT_RECORD_LEN, INPUT_HEADER_LEN, INTRINSIC_EXECUTION_OUTPUT_TYPE_URL,
};
use clockmesh_store::MemoryFrameStore;
use rand::RngCore;

/// The filter most fixtures live under.
pub fn test_filter() -> Filter {
    Filter::from_bytes(vec![0xce, 0x01])
}

/// A random 32-byte peer identity.
pub fn random_peer_id() -> PeerId {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    PeerId::from_bytes(bytes.to_vec())
}

/// A random proving key.
pub fn random_proving_key() -> ProvingKey {
    let mut bytes = [0u8; 57];
    rand::thread_rng().fill_bytes(&mut bytes);
    ProvingKey::from_bytes(bytes.to_vec())
}

/// A commit record whose bytes are derived from a seed, distinct per seed.
pub fn commit_record(seed: u64) -> [u8; COMMIT_RECORD_LEN] {
    let mut record = [0x30u8; COMMIT_RECORD_LEN];
    record[..8].copy_from_slice(&seed.to_be_bytes());
    record
}

/// Frame input bytes: a fixed header followed by the given commit records.
pub fn input_with_commits(commits: &[[u8; COMMIT_RECORD_LEN]]) -> Vec<u8> {
    let mut input = vec![0x42u8; INPUT_HEADER_LEN];
    for c in commits {
        input.extend_from_slice(c);
    }
    input
}

/// A frame with no embedded commits and no proofs.
pub fn bare_frame(frame_number: u64) -> ClockFrame {
    ClockFrame {
        frame_number,
        input: vec![0x42u8; INPUT_HEADER_LEN],
        aggregate_proofs: vec![],
    }
}

/// A frame with one commit record and one single-segment commitment
/// carrying `data`.
pub fn frame_with_commitment(frame_number: u64, data: &[u8]) -> ClockFrame {
    let filter = test_filter();
    ClockFrame {
        frame_number,
        input: input_with_commits(&[commit_record(frame_number)]),
        aggregate_proofs: vec![InclusionAggregateProof {
            filter: filter.clone(),
            frame_number,
            inclusion_commitments: vec![InclusionCommitment {
                filter,
                frame_number,
                position: 0,
                type_url: "fixture.Blob".into(),
                data: data.to_vec(),
                commitment: vec![frame_number as u8],
            }],
            proof: vec![0xab, frame_number as u8],
        }],
    }
}

/// A frame whose single commitment is an intrinsic execution output.
pub fn frame_with_intrinsic_output(frame_number: u64, output: &[u8], proof: &[u8]) -> ClockFrame {
    let filter = test_filter();
    let intrinsic = IntrinsicExecutionOutput {
        address: [0x55; 32],
        output: output.to_vec(),
        proof: proof.to_vec(),
    };
    let data = intrinsic
        .to_canonical_bytes()
        .unwrap_or_else(|e| panic!("fixture encoding failed: {e}"));
    ClockFrame {
        frame_number,
        input: input_with_commits(&[commit_record(frame_number)]),
        aggregate_proofs: vec![InclusionAggregateProof {
            filter: filter.clone(),
            frame_number,
            inclusion_commitments: vec![InclusionCommitment {
                filter,
                frame_number,
                position: 0,
                type_url: INTRINSIC_EXECUTION_OUTPUT_TYPE_URL.into(),
                data,
                commitment: vec![frame_number as u8],
            }],
            proof: vec![0xab, frame_number as u8],
        }],
    }
}

/// Fill a frame store with commitment-bearing frames for `range`.
pub fn populate_frames(
    store: &MemoryFrameStore,
    filter: &Filter,
    range: std::ops::RangeInclusive<u64>,
) {
    for n in range {
        store.put_frame(filter, frame_with_commitment(n, format!("frame {n}").as_bytes()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_frames_are_well_formed() {
        let frame = frame_with_commitment(7, b"data");
        assert_eq!(frame.commit_count().unwrap(), 1);
        assert_eq!(frame.aggregate_proofs.len(), 1);

        let intrinsic = frame_with_intrinsic_output(8, b"out", b"proof");
        assert_eq!(intrinsic.commit_count().unwrap(), 1);
    }
}
