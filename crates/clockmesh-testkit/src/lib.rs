//! # Clockmesh Testkit
//!
//! Testing utilities for Clockmesh.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: frame and payload builders with valid input layouts
//! - **Harness**: recording doubles for the engine's application boundary
//!   and a lookup-counting key store wrapper
//!
//! ## Fixtures
//!
//! ```rust
//! use clockmesh_testkit::fixtures::{frame_with_commitment, test_filter};
//!
//! let frame = frame_with_commitment(1, b"hello");
//! assert_eq!(frame.commit_count().unwrap(), 1);
//! ```

pub mod fixtures;
pub mod harness;

pub use fixtures::{
    bare_frame, commit_record, frame_with_commitment, frame_with_intrinsic_output,
    input_with_commits, populate_frames, random_peer_id, random_proving_key, test_filter,
};
pub use harness::{CountingKeyStore, IngestedFrame, RecordingApplication};
