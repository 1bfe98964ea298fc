//! Daemon host: runs the audio system device on a UDP frame transport
//!
//! The host handles:
//! - Transport setup and frame decoding
//! - A single dispatch loop feeding the device (frames, timers, commands)
//! - `<Feature Abort>` replies for directed messages nobody handled
//! - Statistics
//!
//! The device itself never sees the transport or the runtime; it talks to
//! the `ChannelBus`, `SoftwareAmplifier` and `LocalPower` collaborators.

pub mod audio;
pub mod bus;
pub mod power;
pub mod stats;

pub use audio::SoftwareAmplifier;
pub use bus::ChannelBus;
pub use power::LocalPower;
pub use stats::Stats;

use crate::cec::{CecMessage, FeatureAbortReason, Opcode};
use crate::codec;
use crate::config::Config;
use crate::constants::SHUTDOWN_POLL_MS;
use crate::device::{AudioSystemDevice, BusAdapter, DeviceSettings, Dispatch, Event};
use crate::error::Result;
use crate::transport::{Transport, TransportChannels, UdpTransport};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The device as the daemon runs it
pub type DaemonDevice = AudioSystemDevice<SoftwareAmplifier, ChannelBus, LocalPower>;

/// Bind the UDP transport and run until shutdown
///
/// `commands` carries host-side triggers (ARC up/down, standby, power on)
/// into the dispatch loop.
pub async fn run(
    config: &Config,
    commands: mpsc::Receiver<Event>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Stats>,
) -> Result<()> {
    let transport = UdpTransport::new(config.transport.bind_port, config.transport.peer);
    let channels = transport.spawn(shutdown.clone())?;
    info!(
        port = config.transport.bind_port,
        peer = ?config.transport.peer,
        "UDP transport ready"
    );

    Host::new(config, channels, commands, stats).run(shutdown).await
}

/// Dispatch loop owning the device
pub struct Host {
    device: DaemonDevice,
    frames: mpsc::Receiver<Bytes>,
    events: mpsc::UnboundedReceiver<Event>,
    commands: mpsc::Receiver<Event>,
    stats: Arc<Stats>,
}

impl Host {
    pub fn new(
        config: &Config,
        channels: TransportChannels,
        commands: mpsc::Receiver<Event>,
        stats: Arc<Stats>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let bus = ChannelBus::new(channels.tx, event_tx, stats.clone());
        let device = AudioSystemDevice::new(
            DeviceSettings::from(config),
            SoftwareAmplifier::new(config.device.max_volume),
            bus,
            LocalPower::new(),
        );

        Self {
            device,
            frames: channels.rx,
            events: event_rx,
            commands,
            stats,
        }
    }

    pub fn device(&self) -> &DaemonDevice {
        &self.device
    }

    /// Run until shutdown or transport disconnect
    ///
    /// Announces the device and applies the power-on policy first.
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        self.device.announce();
        self.device.handle_event(Event::PowerOn);

        loop {
            tokio::select! {
                biased;

                _ = tokio::time::sleep(Duration::from_millis(SHUTDOWN_POLL_MS)) => {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                }

                frame = self.frames.recv() => {
                    match frame {
                        Some(frame) => self.on_frame(&frame),
                        None => {
                            warn!("Transport closed");
                            break;
                        }
                    }
                }

                Some(event) = self.events.recv() => self.on_event(event),

                Some(command) = self.commands.recv() => {
                    debug!(?command, "Host command");
                    self.device.handle_event(command);
                }
            }
        }

        info!(stats = %self.stats, "Dispatch loop stopped");
        Ok(())
    }

    fn on_frame(&mut self, frame: &[u8]) {
        self.stats.add_rx();
        let message = match codec::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                self.stats.add_malformed();
                warn!(frame = ?frame, "Dropping frame: {}", e);
                return;
            }
        };

        if self.device.handle_message(&message) == Dispatch::Unhandled {
            self.stats.add_unhandled();
            self.feature_abort(&message);
        }
    }

    fn on_event(&mut self, event: Event) {
        if let Event::Timeout(timer) = event {
            self.device.bus_mut().timer_fired(timer);
        }
        self.device.handle_event(event);
    }

    /// Answer an unhandled directed message with `<Feature Abort>`
    ///
    /// Never for broadcasts or for `<Feature Abort>` itself. `<Abort>` is
    /// answered with "refused", remote keys outside System Audio Mode with
    /// "not in correct mode".
    fn feature_abort(&mut self, message: &CecMessage) {
        if message.is_broadcast() || message.opcode() == Opcode::FeatureAbort {
            return;
        }
        let reason = match message.opcode() {
            Opcode::Abort => FeatureAbortReason::Refused,
            Opcode::UserControlPressed if !self.device.is_system_audio_mode_on() => {
                FeatureAbortReason::NotInCorrectMode
            }
            _ => FeatureAbortReason::UnrecognizedOpcode,
        };
        let local = self.device.settings().logical_address;
        debug!(%message, ?reason, "Feature abort");
        self.device.bus_mut().send(CecMessage::feature_abort(
            local,
            message.source(),
            message.opcode(),
            reason,
        ));
    }
}
