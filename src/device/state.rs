//! Controller state and collaborators, seen by actions as `ActionContext`

use super::{
    AudioCollaborator, BusAdapter, DeviceSettings, PowerCollaborator, PowerState, TimerId,
};
use crate::action::{ActionContext, ActionPolicy};
use crate::cec::{ActiveSource, CecMessage, LogicalAddress};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything the controller owns except its action registry
///
/// Kept apart from the registry so an action can borrow the core mutably
/// while the registry itself is borrowed.
pub struct DeviceCore<A, B, P> {
    pub(crate) settings: DeviceSettings,
    pub(crate) audio: A,
    pub(crate) bus: B,
    pub(crate) power: P,
    pub(crate) system_audio_on: bool,
    pub(crate) arc_established: bool,
    pub(crate) active_source: ActiveSource,
    pub(crate) power_state: PowerState,
    /// System Audio Mode as it was when standby was last entered
    pub(crate) last_system_audio_on: bool,
    next_timer: u64,
}

impl<A, B, P> DeviceCore<A, B, P>
where
    A: AudioCollaborator,
    B: BusAdapter,
    P: PowerCollaborator,
{
    pub(crate) fn new(settings: DeviceSettings, audio: A, bus: B, power: P) -> Self {
        let power_state = power.power_state();
        Self {
            settings,
            audio,
            bus,
            power,
            system_audio_on: false,
            arc_established: false,
            active_source: ActiveSource::NONE,
            power_state,
            last_system_audio_on: false,
            next_timer: 0,
        }
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub(crate) fn wake(&mut self) {
        if self.power_state == PowerState::Standby {
            info!("Waking up");
        }
        self.power.wake();
        self.power_state = PowerState::Awake;
    }

    /// Reply to the sender of `request`
    pub(crate) fn reply(
        &mut self,
        request: &CecMessage,
        build: impl FnOnce(LogicalAddress, LogicalAddress) -> CecMessage,
    ) {
        let message = build(self.settings.logical_address, request.source());
        self.send(message);
    }
}

impl<A, B, P> ActionContext for DeviceCore<A, B, P>
where
    A: AudioCollaborator,
    B: BusAdapter,
    P: PowerCollaborator,
{
    fn local_address(&self) -> LogicalAddress {
        self.settings.logical_address
    }

    fn policy(&self) -> ActionPolicy {
        self.settings.action_policy
    }

    fn now(&self) -> Instant {
        self.bus.now()
    }

    fn send(&mut self, message: CecMessage) {
        debug!(%message, "TX");
        self.bus.send(message);
    }

    fn arm_timer(&mut self, delay: Duration) -> TimerId {
        self.next_timer += 1;
        let timer = TimerId(self.next_timer);
        self.bus.schedule_after(delay, timer);
        timer
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.bus.cancel(timer);
    }

    fn active_source(&self) -> ActiveSource {
        self.active_source
    }

    fn set_active_source(&mut self, source: ActiveSource) {
        if source != self.active_source {
            debug!(
                logical = ?source.logical_address,
                physical = %source.physical_address,
                "Active source changed"
            );
        }
        self.active_source = source;
    }

    /// Enabling unmutes local playback, disabling mutes it. Enabling while
    /// in standby wakes the device first.
    fn set_system_audio_mode(&mut self, on: bool) {
        if on && self.power_state == PowerState::Standby {
            self.wake();
        }
        if self.system_audio_on != on {
            info!(on, "System Audio Mode changed");
        }
        self.system_audio_on = on;
        self.audio.set_mute(!on);
    }

    fn set_arc_established(&mut self, established: bool) {
        if self.arc_established != established {
            info!(established, "ARC state changed");
        }
        self.arc_established = established;
    }
}
