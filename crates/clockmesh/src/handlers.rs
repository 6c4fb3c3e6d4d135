//! Application-boundary traits.
//!
//! The engine does not validate or persist reconstructed frames itself; it
//! hands them across these seams. Integrators implement both on one
//! application object.

use async_trait::async_trait;

use clockmesh_core::{ClockFrame, KeyBundleAnnouncement, PeerId, ProvingKeyAnnouncement};
use clockmesh_sync::SyncError;

/// Receives frames the engine has obtained from peers.
#[async_trait]
pub trait FrameIngest: Send + Sync {
    /// Ingest one frame.
    ///
    /// `source_peer` is the sync target the frame came from, when known.
    /// `is_historical` distinguishes out-of-band sync catch-up from live
    /// gossip frames.
    async fn ingest_frame(
        &self,
        source_peer: Option<PeerId>,
        application_address: [u8; 32],
        frame: ClockFrame,
        is_historical: bool,
    ) -> Result<(), SyncError>;
}

/// Receives proving-key events dispatched off gossip.
#[async_trait]
pub trait KeyEventHandler: Send + Sync {
    /// A peer announced its proving key.
    async fn on_proving_key_announcement(
        &self,
        from: PeerId,
        announcement: ProvingKeyAnnouncement,
    ) -> Result<(), SyncError>;

    /// A peer announced a key bundle.
    async fn on_key_bundle_announcement(
        &self,
        from: PeerId,
        announcement: KeyBundleAnnouncement,
    ) -> Result<(), SyncError>;
}
