//! Proving-key records exchanged over gossip.
//!
//! These are carried as tagged payloads inside envelopes; the tag constants
//! here drive the dispatcher's closed-enum classification. The core never
//! verifies signatures or commitments; it matches and forwards bytes.

use serde::{Deserialize, Serialize};

use crate::types::ProvingKey;

/// Tag for [`ProvingKeyAnnouncement`] payloads.
pub const PROVING_KEY_ANNOUNCEMENT_TAG: &str = "ceremony.keys.ProvingKeyAnnouncement";

/// Tag for [`ProvingKeyRequest`] payloads.
pub const PROVING_KEY_REQUEST_TAG: &str = "ceremony.keys.ProvingKeyRequest";

/// Tag for [`KeyBundleAnnouncement`] payloads.
pub const KEY_BUNDLE_ANNOUNCEMENT_TAG: &str = "ceremony.keys.KeyBundleAnnouncement";

/// A peer publishing its proving key together with an identity commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingKeyAnnouncement {
    pub proving_key: ProvingKey,
    pub identity_commitment: Vec<u8>,
    pub signature: Vec<u8>,
}

/// A peer asking others to supply the announcement for a proving key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingKeyRequest {
    pub proving_key: ProvingKey,
}

/// A peer publishing the key bundle associated with a proving key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBundleAnnouncement {
    pub proving_key: ProvingKey,
    pub bundle: Vec<u8>,
    pub signature: Vec<u8>,
}
