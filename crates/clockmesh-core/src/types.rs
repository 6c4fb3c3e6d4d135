//! Strong type definitions for Clockmesh.
//!
//! Peer identities, filters, and proving keys are opaque byte strings on the
//! wire; newtypes keep them from being mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known application address the ceremony intrinsic lives under.
///
/// Reconstructed frames are handed to the application layer tagged with this
/// address.
pub const CEREMONY_APPLICATION_ADDRESS: [u8; 32] = [
    0x0c, 0xe7, 0xe3, 0x1a, 0x54, 0x16, 0x9b, 0x28, 0x77, 0x03, 0x9d, 0x11, 0xf2, 0x42, 0x5e,
    0xcc, 0x81, 0x6a, 0x0f, 0x39, 0xd5, 0x5b, 0x24, 0x90, 0xab, 0x17, 0x6e, 0xc8, 0x33, 0x05,
    0xfa, 0x61,
];

/// Logical chain/shard identifier scoping frames, keys, and gossip topics.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter(pub Vec<u8>);

impl Filter {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Topic bytes for a reply channel scoped to a specific peer:
    /// `filter ++ peer_id`.
    pub fn reply_topic(&self, peer: &PeerId) -> Vec<u8> {
        let mut topic = self.0.clone();
        topic.extend_from_slice(&peer.0);
        topic
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({})", truncated_hex(&self.0))
    }
}

impl AsRef<[u8]> for Filter {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Identity of a peer on the gossip substrate.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub Vec<u8>);

impl PeerId {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", truncated_hex(&self.0))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncated_hex(&self.0))
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A proving key identifying a ceremony participant.
///
/// The core never verifies these; they are matched and forwarded as bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvingKey(pub Vec<u8>);

impl ProvingKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// An empty key marks a malformed or no-op request.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for ProvingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProvingKey({})", truncated_hex(&self.0))
    }
}

impl AsRef<[u8]> for ProvingKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte Blake3 hash addressing a segment's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentHash(pub [u8; 32]);

impl SegmentHash {
    /// Hash segment data.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SegmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentHash({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for SegmentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for SegmentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A content-addressed raw data blob referenced from commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Blake3 hash of `data`.
    pub hash: SegmentHash,
    /// The raw bytes.
    pub data: Vec<u8>,
}

impl Segment {
    /// Create a segment, computing its content hash.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            hash: SegmentHash::of(&data),
            data,
        }
    }
}

fn truncated_hex(bytes: &[u8]) -> String {
    let h = hex::encode(bytes);
    if h.len() > 16 {
        format!("{}..", &h[..16])
    } else {
        h
    }
}
