//! Clockmesh sync: the protocol surface between peers.
//!
//! Wire messages and the envelope codec, the gossip substrate abstraction,
//! the compressed frame sync server, and the proving-key-brokered direct
//! channel. The consensus engine in the facade crate drives all of it.

pub mod channel;
pub mod error;
pub mod gossip;
pub mod messages;
pub mod server;

pub use channel::{
    open_public_channel, ChannelConfig, PublicChannel, DEFAULT_ESTABLISH_TIMEOUT,
    DEFAULT_MAX_MESSAGE_SIZE,
};
pub use error::{ErrorClass, Result, SyncError};
pub use gossip::{memory::MemoryGossip, memory::MemoryGossipNetwork, GossipHandler, GossipSubstrate};
pub use messages::{Envelope, FrameRangeRequest, GossipMessage, KnownPayload, TaggedPayload};
pub use server::{
    serve_compressed_sync_frames, BufferSink, SyncFrameSink, MAX_FRAMES_PER_RESPONSE,
};
