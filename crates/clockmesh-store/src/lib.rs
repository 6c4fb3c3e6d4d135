//! Clockmesh storage: frame and proving-key persistence interfaces.
//!
//! The engine only ever talks to the [`FrameStore`] and [`KeyStore`] traits;
//! this crate ships in-memory implementations for tests and embedding.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryFrameStore, MemoryKeyStore};
pub use traits::{CommittedKeyEntry, FrameMetadata, FrameStore, KeyStore};
