//! # Clockmesh
//!
//! Peer messaging and frame synchronization for a distributed consensus
//! mesh.
//!
//! ## Overview
//!
//! Clockmesh moves clock frames between peers:
//!
//! - **Clock frames**: the ordered units of consensus history, carrying
//!   inclusion proofs over application data
//! - **Compressed sync**: frames ship with proofs stripped, plus
//!   deduplicated segments they are reconstructed from
//! - **Gossip dispatch**: tagged payloads (key announcements, key bundle
//!   announcements, key requests) routed to application handlers
//! - **Direct channels**: peer-to-peer byte streams brokered by proving key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clockmesh::{ConsensusEngine, EngineConfig};
//! use clockmesh::core::Filter;
//! use clockmesh::store::{MemoryFrameStore, MemoryKeyStore};
//! use clockmesh::sync::MemoryGossipNetwork;
//! # use clockmesh::{FrameIngest, KeyEventHandler};
//! # async fn example<A: FrameIngest + KeyEventHandler + 'static>(app: Arc<A>) {
//! let network = MemoryGossipNetwork::new();
//! let gossip = Arc::new(network.create_gossip(clockmesh::core::PeerId::from_bytes(vec![1])));
//!
//! let engine = ConsensusEngine::new(
//!     Filter::from_bytes(vec![0xce]),
//!     Arc::new(MemoryFrameStore::new()),
//!     Arc::new(MemoryKeyStore::new()),
//!     gossip,
//!     app,
//!     EngineConfig::default(),
//! );
//!
//! engine.join().await.unwrap();
//! # }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `clockmesh::core` - Frames, proofs, segments, compression
//! - `clockmesh::store` - Frame and key store traits
//! - `clockmesh::sync` - Wire messages, gossip substrate, channels

pub mod engine;
pub mod handlers;

// Re-export component crates
pub use clockmesh_core as core;
pub use clockmesh_store as store;
pub use clockmesh_sync as sync;

// Re-export main types for convenience
pub use engine::{ConsensusEngine, EngineConfig};
pub use handlers::{FrameIngest, KeyEventHandler};

// Re-export commonly used types
pub use clockmesh_core::{
    ClockFrame, CompressedSyncPayload, Filter, PeerId, ProvingKey, TruncatedClockFrame,
};
pub use clockmesh_sync::{
    ChannelConfig, ErrorClass, FrameRangeRequest, GossipMessage, PublicChannel, Result, SyncError,
};
