//! Bus adapter backed by the transport channel and tokio timers

use super::stats::Stats;
use crate::cec::CecMessage;
use crate::codec;
use crate::device::{BusAdapter, Event, TimerId};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// `BusAdapter` for the daemon
///
/// Frames go out on the transport's TX channel in call order. Timers are
/// tokio sleeps that post `Event::Timeout` back into the dispatch loop, so
/// timeout handling runs on the same queue as everything else.
///
/// Must be used from inside a tokio runtime.
pub struct ChannelBus {
    frames: mpsc::Sender<Bytes>,
    events: mpsc::UnboundedSender<Event>,
    timers: HashMap<TimerId, JoinHandle<()>>,
    stats: Arc<Stats>,
}

impl ChannelBus {
    pub fn new(
        frames: mpsc::Sender<Bytes>,
        events: mpsc::UnboundedSender<Event>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            frames,
            events,
            timers: HashMap::new(),
            stats,
        }
    }

    /// Forget a timer that has already fired
    pub fn timer_fired(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

impl BusAdapter for ChannelBus {
    fn send(&mut self, message: CecMessage) {
        match self.frames.try_send(codec::encode(&message)) {
            Ok(()) => self.stats.add_tx(),
            Err(e) => warn!(%message, "Dropping outgoing frame: {}", e),
        }
    }

    fn schedule_after(&mut self, delay: Duration, timer: TimerId) {
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::Timeout(timer));
        });
        if let Some(old) = self.timers.insert(timer, handle) {
            old.abort();
        }
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(handle) = self.timers.remove(&timer) {
            handle.abort();
        }
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl Drop for ChannelBus {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
