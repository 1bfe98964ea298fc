//! Transport abstraction for frame-level I/O
//!
//! Separates I/O concerns from protocol logic:
//! - **Transport**: How CEC frames reach the daemon (UDP datagrams)
//! - **Codec**: How frames map to messages (handled separately)
//!
//! One item on a transport channel is exactly one CEC frame.

pub mod udp;

pub use udp::UdpTransport;

use bytes::Bytes;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;

/// Channels for bidirectional communication with a transport
///
/// The transport owns the underlying I/O and communicates via these
/// channels. When the transport stops (shutdown or error), it closes them.
pub struct TransportChannels {
    /// Frames received from the bus
    ///
    /// Returns `None` when the transport has stopped.
    pub rx: mpsc::Receiver<Bytes>,

    /// Frames to put on the bus, written in send order
    pub tx: mpsc::Sender<Bytes>,
}

/// Trait for spawnable transports
///
/// A transport handles opening the I/O and moving raw frames. It does NOT
/// decode frames or keep statistics; that is the host loop's job.
pub trait Transport: Send + 'static {
    /// Spawn the transport in background
    ///
    /// Runs until `shutdown` is set or the channels are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be initialized
    /// (e.g. bind failed).
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels>;
}
