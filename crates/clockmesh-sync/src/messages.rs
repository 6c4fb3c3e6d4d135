//! Wire message types for peer messaging.
//!
//! Gossip carries opaque signed byte strings; inside them is an [`Envelope`]
//! addressing an application, and inside that a [`TaggedPayload`] whose tag
//! selects a concrete record type. Dispatch is over the closed
//! [`KnownPayload`] enum; unrecognized tags land in `Unknown` and are a
//! no-op, not an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use clockmesh_core::{
    from_canonical_slice, to_canonical_vec, Filter, KeyBundleAnnouncement, PeerId,
    ProvingKeyAnnouncement, ProvingKeyRequest, KEY_BUNDLE_ANNOUNCEMENT_TAG,
    PROVING_KEY_ANNOUNCEMENT_TAG, PROVING_KEY_REQUEST_TAG,
};

use crate::error::{Result, SyncError};

/// A message as delivered by the gossip substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipMessage {
    /// The originating peer.
    pub from: PeerId,
    /// Envelope bytes.
    pub data: Vec<u8>,
    /// Substrate-level signature over `data`. Opaque here; the substrate
    /// verifies it before delivery.
    pub signature: Vec<u8>,
}

/// Application-addressed wrapper around a tagged payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Application address the payload is destined for.
    pub address: Vec<u8>,
    /// The tagged payload.
    pub payload: TaggedPayload,
}

impl Envelope {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        to_canonical_vec(self).map_err(|e| SyncError::Decode(e.to_string()))
    }

    /// Decode from wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        from_canonical_slice(bytes).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

/// A payload carrying its own type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedPayload {
    /// Selects the concrete record type of `value`.
    pub type_tag: String,
    /// Canonical bytes of the record.
    pub value: Vec<u8>,
}

impl TaggedPayload {
    /// Pack a record under a tag.
    pub fn pack<T: Serialize>(type_tag: &str, value: &T) -> Result<Self> {
        Ok(Self {
            type_tag: type_tag.to_string(),
            value: to_canonical_vec(value).map_err(|e| SyncError::Decode(e.to_string()))?,
        })
    }

    /// Unpack the record, assuming the caller matched the tag.
    pub fn unpack<T: DeserializeOwned>(&self) -> Result<T> {
        from_canonical_slice(&self.value).map_err(|e| SyncError::Decode(e.to_string()))
    }

    /// Classify into the closed set of known payload kinds.
    pub fn classify(&self) -> Result<KnownPayload> {
        match self.type_tag.as_str() {
            PROVING_KEY_ANNOUNCEMENT_TAG => {
                Ok(KnownPayload::ProvingKeyAnnouncement(self.unpack()?))
            }
            KEY_BUNDLE_ANNOUNCEMENT_TAG => Ok(KnownPayload::KeyBundleAnnouncement(self.unpack()?)),
            PROVING_KEY_REQUEST_TAG => Ok(KnownPayload::ProvingKeyRequest(self.unpack()?)),
            other => Ok(KnownPayload::Unknown(other.to_string())),
        }
    }
}

/// The closed set of payload kinds the dispatcher understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownPayload {
    ProvingKeyAnnouncement(ProvingKeyAnnouncement),
    KeyBundleAnnouncement(KeyBundleAnnouncement),
    ProvingKeyRequest(ProvingKeyRequest),
    /// A tag nobody here understands. No-op, not an error.
    Unknown(String),
}

/// A request for a range of compressed sync frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRangeRequest {
    /// Filter the frames belong to.
    pub filter: Filter,
    /// First frame wanted, inclusive.
    pub from_frame_number: u64,
    /// Last frame wanted, inclusive. Zero means "to the latest".
    pub to_frame_number: u64,
}
