//! Canonical CBOR encoding for wire values.
//!
//! Every value that crosses the wire (envelopes, payloads, intrinsic
//! execution outputs) goes through these helpers. Segment hashes are
//! computed over raw segment bytes rather than over CBOR, so the only
//! property required here is that encoding the same value twice yields the
//! same bytes: ciborium emits definite lengths and struct fields in
//! declaration order, which is sufficient.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

/// Encode a value to canonical CBOR bytes.
pub fn to_canonical_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CoreError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Decode a value from CBOR bytes.
pub fn from_canonical_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CoreError> {
    ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        number: u64,
        bytes: Vec<u8>,
        label: String,
    }

    #[test]
    fn test_roundtrip() {
        let value = Sample {
            number: 42,
            bytes: vec![1, 2, 3],
            label: "frame".into(),
        };
        let encoded = to_canonical_vec(&value).unwrap();
        let decoded: Sample = from_canonical_slice(&encoded).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn test_encoding_deterministic() {
        let value = Sample {
            number: u64::MAX,
            bytes: vec![0; 64],
            label: "x".into(),
        };
        assert_eq!(
            to_canonical_vec(&value).unwrap(),
            to_canonical_vec(&value).unwrap()
        );
    }

    #[test]
    fn test_garbage_rejected() {
        let result: Result<Sample, _> = from_canonical_slice(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CoreError::Decoding(_))));
    }
}
