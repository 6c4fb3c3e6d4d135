//! Clock frames and their input layout.
//!
//! A frame's `input` carries a fixed 516-byte header followed by zero or
//! more 74-byte commitment records, one per embedded proof aggregate.
//! Invariant: `(input.len() - 516) % 74 == 0`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::proofs::InclusionAggregateProof;

/// Length of the fixed frame input header.
pub const INPUT_HEADER_LEN: usize = 516;

/// Length of one commitment record embedded in the frame input.
pub const COMMIT_RECORD_LEN: usize = 74;

/// The unit of the consensus ledger's ordered history.
///
/// Frame numbers increase monotonically per filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockFrame {
    /// Position in the clock, monotonic per filter.
    pub frame_number: u64,
    /// Header plus embedded commitment records.
    pub input: Vec<u8>,
    /// Inclusion proofs for the commitments embedded in `input`.
    pub aggregate_proofs: Vec<InclusionAggregateProof>,
}

impl ClockFrame {
    /// Number of commitment records embedded in the input.
    pub fn commit_count(&self) -> Result<usize, CoreError> {
        commit_count(&self.input)
    }

    /// Slice out the embedded commitment records.
    pub fn commit_records(&self) -> Result<Vec<&[u8]>, CoreError> {
        commit_records(&self.input)
    }

    /// The wire form sent during sync: same input, proofs stripped.
    pub fn truncate(&self) -> TruncatedClockFrame {
        TruncatedClockFrame {
            frame_number: self.frame_number,
            input: self.input.clone(),
        }
    }
}

/// Wire form of a [`ClockFrame`]: aggregate proofs are reconstructed on the
/// receiving side instead of being transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncatedClockFrame {
    /// Position in the clock.
    pub frame_number: u64,
    /// Header plus embedded commitment records, identical to the full frame.
    pub input: Vec<u8>,
}

impl TruncatedClockFrame {
    /// Number of commitment records embedded in the input.
    pub fn commit_count(&self) -> Result<usize, CoreError> {
        commit_count(&self.input)
    }

    /// Slice out the embedded commitment records.
    pub fn commit_records(&self) -> Result<Vec<&[u8]>, CoreError> {
        commit_records(&self.input)
    }
}

fn commit_count(input: &[u8]) -> Result<usize, CoreError> {
    if input.len() < INPUT_HEADER_LEN {
        return Err(CoreError::MalformedInput(format!(
            "input is {} bytes, header alone is {}",
            input.len(),
            INPUT_HEADER_LEN
        )));
    }
    let tail = input.len() - INPUT_HEADER_LEN;
    if tail % COMMIT_RECORD_LEN != 0 {
        return Err(CoreError::MalformedInput(format!(
            "{} trailing bytes is not a whole number of {}-byte commit records",
            tail, COMMIT_RECORD_LEN
        )));
    }
    Ok(tail / COMMIT_RECORD_LEN)
}

fn commit_records(input: &[u8]) -> Result<Vec<&[u8]>, CoreError> {
    let count = commit_count(input)?;
    Ok((0..count)
        .map(|j| {
            let start = INPUT_HEADER_LEN + j * COMMIT_RECORD_LEN;
            &input[start..start + COMMIT_RECORD_LEN]
        })
        .collect())
}
