//! Direct peer-to-peer channels brokered by proving key.
//!
//! A [`PublicChannel`] is a bounded duplex byte-message stream handed to both
//! sides once a rendezvous succeeds. [`open_public_channel`] races the
//! rendezvous against a deadline on the initiator side and dials on the
//! responder side; both sides may come back with no channel at all, which is
//! not an error.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::sleep;
use tracing::{debug, warn};

use clockmesh_core::ProvingKey;

use crate::error::{Result, SyncError};
use crate::gossip::GossipSubstrate;

/// Default deadline for the initiator-side rendezvous.
pub const DEFAULT_ESTABLISH_TIMEOUT: Duration = Duration::from_secs(20);

/// Default per-message size ceiling: 400 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 400 * 1024 * 1024;

const CHANNEL_DEPTH: usize = 64;

/// Tunables for channel establishment. Injectable so tests can shorten the
/// rendezvous deadline.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long the initiator waits for a peer to connect.
    pub establish_timeout: Duration,
    /// Largest message either side may send.
    pub max_message_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            establish_timeout: DEFAULT_ESTABLISH_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// One end of an established direct channel.
pub struct PublicChannel {
    tx: mpsc::Sender<Bytes>,
    rx: Mutex<mpsc::Receiver<Bytes>>,
    max_message_size: usize,
}

impl PublicChannel {
    /// Create a connected pair of channel ends.
    pub fn pair(max_message_size: usize) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (b_tx, b_rx) = mpsc::channel(CHANNEL_DEPTH);
        (
            Self {
                tx: a_tx,
                rx: Mutex::new(b_rx),
                max_message_size,
            },
            Self {
                tx: b_tx,
                rx: Mutex::new(a_rx),
                max_message_size,
            },
        )
    }

    /// Send one message to the peer.
    pub async fn send(&self, data: Bytes) -> Result<()> {
        if data.len() > self.max_message_size {
            return Err(SyncError::Transport(format!(
                "message of {} bytes exceeds the {} byte channel limit",
                data.len(),
                self.max_message_size
            )));
        }
        self.tx
            .send(data)
            .await
            .map_err(|_| SyncError::Transport("channel closed by peer".into()))
    }

    /// Receive the next message, or `None` once the peer hangs up.
    pub async fn recv(&self) -> Option<Bytes> {
        self.rx.lock().await.recv().await
    }
}

/// Establish a direct channel keyed by a proving key.
///
/// Initiator side: registers a listener under the key and waits for the
/// first peer to connect; listener registration failure resolves to no
/// channel (`Ok(None)`), while an expired deadline is `SyncError::Timeout`.
/// Responder side: dials the key; a failed dial is logged and resolves to
/// no channel.
pub async fn open_public_channel<G: GossipSubstrate + ?Sized + 'static>(
    gossip: Arc<G>,
    config: &ChannelConfig,
    initiator: bool,
    proving_key: &ProvingKey,
) -> Result<Option<PublicChannel>> {
    if initiator {
        let (mut slot_tx, slot_rx) = oneshot::channel::<Option<PublicChannel>>();
        let (accepted_tx, mut accepted_rx) = mpsc::channel::<PublicChannel>(1);
        let key = proving_key.clone();
        tokio::spawn(async move {
            if let Err(e) = gossip.start_direct_channel_listener(&key, accepted_tx).await {
                warn!(key = %key.to_hex(), error = %e, "direct channel listener registration failed");
                let _ = slot_tx.send(None);
                return;
            }
            // The listener's lifetime is tied to the waiting call: once the
            // slot is dropped there is nobody to hand a channel to.
            tokio::select! {
                channel = accepted_rx.recv() => {
                    let _ = slot_tx.send(channel);
                }
                _ = slot_tx.closed() => {}
            }
        });

        tokio::select! {
            slot = slot_rx => Ok(slot.unwrap_or(None)),
            _ = sleep(config.establish_timeout) => Err(SyncError::Timeout(format!(
                "no peer connected for key {} within {:?}",
                proving_key.to_hex(),
                config.establish_timeout
            ))),
        }
    } else {
        match gossip.dial_direct_channel(proving_key).await {
            Ok(channel) => Ok(Some(channel)),
            Err(e) => {
                debug!(key = %proving_key.to_hex(), error = %e, "direct channel dial failed");
                Ok(None)
            }
        }
    }
}
