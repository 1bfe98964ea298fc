//! Traffic statistics for the daemon
//!
//! Lock-free counters, shared between the dispatch loop and whoever
//! reports them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Frame counters (fully lock-free)
#[derive(Debug, Default)]
pub struct Stats {
    /// Frames received from the transport
    rx_frames: AtomicU64,
    /// Frames handed to the transport
    tx_frames: AtomicU64,
    /// Received frames the codec rejected
    malformed: AtomicU64,
    /// Messages addressed to us that no handler took
    unhandled: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_rx(&self) {
        self.rx_frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_tx(&self) {
        self.tx_frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_unhandled(&self) {
        self.unhandled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rx_frames(&self) -> u64 {
        self.rx_frames.load(Ordering::Relaxed)
    }

    pub fn tx_frames(&self) -> u64 {
        self.tx_frames.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn unhandled(&self) -> u64 {
        self.unhandled.load(Ordering::Relaxed)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx={} tx={} malformed={} unhandled={}",
            self.rx_frames(),
            self.tx_frames(),
            self.malformed(),
            self.unhandled()
        )
    }
}
