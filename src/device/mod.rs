//! Local device layer
//!
//! - Collaborator traits the controller is built on (audio, bus, power)
//! - `Event` / `Dispatch`: the single dispatch entry point
//! - `AudioSystemDevice`: the audio system controller itself
//!
//! The controller never talks to the platform directly; everything it needs
//! comes in through the collaborators passed to its constructor.

mod audio_system;
mod state;

pub use audio_system::AudioSystemDevice;
pub use state::DeviceCore;

use crate::action::ActionPolicy;
use crate::cec::{CecMessage, LogicalAddress, PhysicalAddress};
use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

// =============================================================================
// Collaborators
// =============================================================================

/// Direction of a relative volume change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Raise,
    Lower,
    ToggleMute,
}

/// Local amplifier
///
/// All calls are fast local calls and must not block.
pub trait AudioCollaborator {
    /// Current raw volume level
    fn volume(&self) -> i32;
    /// Maximum raw volume level
    fn max_volume(&self) -> i32;
    fn is_muted(&self) -> bool;
    fn set_mute(&mut self, muted: bool);
    fn adjust_volume(&mut self, direction: VolumeDirection);
}

/// Handle for a scheduled timeout
///
/// Allocated by the controller; the bus adapter hands it back through
/// `Event::Timeout` when the delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Bus access and scheduling
///
/// `send` is fire-and-forget; messages must go out in call order.
/// A scheduled timer must be delivered back on the same dispatch queue
/// as `Event::Timeout`, never on another thread.
pub trait BusAdapter {
    fn send(&mut self, message: CecMessage);
    fn schedule_after(&mut self, delay: Duration, timer: TimerId);
    /// Cancel a pending timer (no-op if it already fired)
    fn cancel(&mut self, timer: TimerId);
    fn now(&self) -> Instant;
}

/// Device power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Awake,
    Standby,
}

/// Platform power control
pub trait PowerCollaborator {
    fn wake(&mut self);
    fn standby(&mut self);
    fn power_state(&self) -> PowerState;
}

// =============================================================================
// Dispatch
// =============================================================================

/// Everything the controller reacts to, delivered one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Decoded message from the bus
    Message(CecMessage),
    /// A timer scheduled through `BusAdapter::schedule_after` elapsed
    Timeout(TimerId),
    /// The platform entered standby
    Standby,
    /// The platform powered on
    PowerOn,
    /// Host asks to bring up the audio return channel
    InitiateArc,
    /// Host asks to tear down the audio return channel
    TerminateArc,
}

/// Result of dispatching one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// Addressed to us but no handler took it (caller may feature-abort)
    Unhandled,
    /// Not for us, stale, or malformed
    Ignored,
}

// =============================================================================
// Settings
// =============================================================================

/// What to do with System Audio Mode when the device powers on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PowerOnPolicy {
    AlwaysOn,
    NeverOn,
    #[default]
    UseLastState,
}

/// Static identity and behavior switches of the local device
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub logical_address: LogicalAddress,
    pub physical_address: PhysicalAddress,
    pub osd_name: String,
    pub vendor_id: u32,
    pub power_on_policy: PowerOnPolicy,
    /// Accept System Audio Mode requests at all
    pub system_audio_control: bool,
    /// Accept ARC requests at all
    pub arc_support: bool,
    pub action_policy: ActionPolicy,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            logical_address: LogicalAddress::AUDIO_SYSTEM,
            physical_address: PhysicalAddress::new(0x1000),
            osd_name: "Audio System".to_string(),
            vendor_id: 0,
            power_on_policy: PowerOnPolicy::default(),
            system_audio_control: true,
            arc_support: true,
            action_policy: ActionPolicy::default(),
        }
    }
}

impl From<&Config> for DeviceSettings {
    fn from(config: &Config) -> Self {
        Self {
            logical_address: config.device.logical_address,
            physical_address: config.device.physical_address,
            osd_name: config.device.osd_name.clone(),
            vendor_id: config.device.vendor_id,
            power_on_policy: config.device.power_on_policy,
            system_audio_control: config.device.system_audio_control,
            arc_support: config.device.arc_support,
            action_policy: ActionPolicy {
                timeout: Duration::from_millis(config.actions.timeout_ms),
                max_retries: config.actions.max_retries,
            },
        }
    }
}
