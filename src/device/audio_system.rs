//! Audio system local device controller

use super::{
    AudioCollaborator, BusAdapter, DeviceCore, DeviceSettings, Dispatch, Event, PowerCollaborator,
    PowerOnPolicy, PowerState, TimerId, VolumeDirection,
};
use crate::action::{Action, ActionContext, ActionKind, ActionRegistry};
use crate::cec::{
    ActiveSource, CecMessage, FeatureAbortReason, LogicalAddress, Opcode, PowerStatus, UiCommand,
};
use crate::codec;
use crate::constants::DEVICE_TYPE_AUDIO_SYSTEM;
use crate::error::Result;
use crate::volume::VolumeStatus;
use tracing::{debug, info, warn};

/// CEC audio system (amplifier / soundbar) controller
///
/// Single-threaded: every input arrives through `handle_event` (or
/// `handle_frame`) and runs to completion before the next one.
pub struct AudioSystemDevice<A, B, P> {
    core: DeviceCore<A, B, P>,
    actions: ActionRegistry,
}

impl<A, B, P> AudioSystemDevice<A, B, P>
where
    A: AudioCollaborator,
    B: BusAdapter,
    P: PowerCollaborator,
{
    pub fn new(settings: DeviceSettings, audio: A, bus: B, power: P) -> Self {
        info!(
            logical = %settings.logical_address,
            physical = %settings.physical_address,
            "Audio system device created"
        );
        Self {
            core: DeviceCore::new(settings, audio, bus, power),
            actions: ActionRegistry::new(),
        }
    }

    fn local_address(&self) -> LogicalAddress {
        self.core.settings.logical_address
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub fn handle_event(&mut self, event: Event) -> Dispatch {
        match event {
            Event::Message(message) => self.handle_message(&message),
            Event::Timeout(timer) => self.handle_timeout(timer),
            Event::Standby => {
                self.on_standby();
                Dispatch::Handled
            }
            Event::PowerOn => {
                self.on_power_on();
                Dispatch::Handled
            }
            Event::InitiateArc => {
                self.initiate_arc();
                Dispatch::Handled
            }
            Event::TerminateArc => {
                self.terminate_arc();
                Dispatch::Handled
            }
        }
    }

    /// Decode a raw frame and dispatch it
    pub fn handle_frame(&mut self, frame: &[u8]) -> Dispatch {
        match codec::decode(frame) {
            Ok(message) => self.handle_message(&message),
            Err(e) => {
                warn!(len = frame.len(), "Dropping frame: {}", e);
                Dispatch::Ignored
            }
        }
    }

    pub fn handle_message(&mut self, message: &CecMessage) -> Dispatch {
        let local = self.local_address();
        if message.source() == local {
            return Dispatch::Ignored;
        }
        if message.destination() != local && !message.is_broadcast() {
            return Dispatch::Ignored;
        }
        debug!(%message, "RX");

        if self.actions.dispatch_message(message, &mut self.core) {
            return Dispatch::Handled;
        }

        let handled = match message.opcode() {
            Opcode::GiveAudioStatus => self.handle_give_audio_status(message),
            Opcode::GiveSystemAudioModeStatus => {
                self.handle_give_system_audio_mode_status(message)
            }
            Opcode::SetSystemAudioMode => self.handle_set_system_audio_mode(message),
            Opcode::SystemAudioModeRequest => self.handle_system_audio_mode_request(message),
            Opcode::RequestArcInitiation => self.handle_request_arc_initiation(message),
            Opcode::RequestArcTermination => self.handle_request_arc_termination(message),
            Opcode::ReportArcInitiated => self.handle_report_arc_initiated(message),
            Opcode::ReportArcTerminated => self.handle_report_arc_terminated(message),
            Opcode::ActiveSource => self.handle_active_source(message),
            Opcode::UserControlPressed => self.handle_user_control_pressed(message),
            Opcode::UserControlReleased => true,
            Opcode::GivePhysicalAddress => self.handle_give_physical_address(message),
            Opcode::GiveDevicePowerStatus => self.handle_give_device_power_status(message),
            Opcode::GiveOsdName => self.handle_give_osd_name(message),
            Opcode::GetCecVersion => self.handle_get_cec_version(message),
            Opcode::GiveDeviceVendorId => self.handle_give_device_vendor_id(message),
            Opcode::Standby => self.handle_standby(message),
            _ => false,
        };

        if handled {
            Dispatch::Handled
        } else {
            Dispatch::Unhandled
        }
    }

    fn handle_timeout(&mut self, timer: TimerId) -> Dispatch {
        if self.actions.dispatch_timeout(timer, &mut self.core) {
            Dispatch::Handled
        } else {
            Dispatch::Ignored
        }
    }

    fn refuse(&mut self, message: &CecMessage) {
        let opcode = message.opcode();
        self.core.reply(message, |src, dest| {
            CecMessage::feature_abort(src, dest, opcode, FeatureAbortReason::Refused)
        });
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    /// Reply with the scaled volume and mute flag
    ///
    /// When the amplifier reports an unusable range nothing is sent; the
    /// message still counts as handled.
    pub fn handle_give_audio_status(&mut self, message: &CecMessage) -> bool {
        match VolumeStatus::read(&self.core.audio) {
            Ok(status) => self.core.reply(message, |src, dest| {
                CecMessage::report_audio_status(src, dest, status.scaled, status.muted)
            }),
            Err(e) => warn!("Not reporting audio status: {}", e),
        }
        true
    }

    pub fn handle_give_system_audio_mode_status(&mut self, message: &CecMessage) -> bool {
        let on = self.core.system_audio_on;
        self.core.reply(message, |src, dest| {
            CecMessage::report_system_audio_mode(src, dest, on)
        });
        true
    }

    pub fn handle_set_system_audio_mode(&mut self, message: &CecMessage) -> bool {
        match message.bool_operand() {
            Some(on) => {
                self.set_system_audio_mode(on);
                true
            }
            None => false,
        }
    }

    /// `<System Audio Mode Request>`: with a physical address operand the
    /// mode is requested on, without one it is requested off
    pub fn handle_system_audio_mode_request(&mut self, message: &CecMessage) -> bool {
        if !self.core.settings.system_audio_control {
            debug!("System audio control disabled, refusing request");
            self.refuse(message);
            return true;
        }

        let on = message.physical_address_operand().is_some();
        let local = self.local_address();
        self.core.send(CecMessage::set_system_audio_mode(
            local,
            LogicalAddress::BROADCAST,
            on,
        ));
        self.set_system_audio_mode(on);
        true
    }

    /// Answer with a single `<Initiate ARC>`; ARC is assumed up right away
    pub fn handle_request_arc_initiation(&mut self, message: &CecMessage) -> bool {
        if !self.core.settings.arc_support {
            self.refuse(message);
            return true;
        }
        self.remove_arc_actions();
        let local = self.local_address();
        self.core
            .send(CecMessage::initiate_arc(local, LogicalAddress::TV));
        self.core.set_arc_established(true);
        true
    }

    pub fn handle_request_arc_termination(&mut self, message: &CecMessage) -> bool {
        if !self.core.settings.arc_support {
            self.refuse(message);
            return true;
        }
        self.remove_arc_actions();
        let local = self.local_address();
        self.core
            .send(CecMessage::terminate_arc(local, LogicalAddress::TV));
        self.core.set_arc_established(false);
        true
    }

    pub fn handle_report_arc_initiated(&mut self, _message: &CecMessage) -> bool {
        self.core.set_arc_established(true);
        true
    }

    pub fn handle_report_arc_terminated(&mut self, _message: &CecMessage) -> bool {
        self.core.set_arc_established(false);
        true
    }

    pub fn handle_active_source(&mut self, message: &CecMessage) -> bool {
        match message.physical_address_operand() {
            Some(physical) => {
                self.core
                    .set_active_source(ActiveSource::new(message.source(), physical));
                true
            }
            None => false,
        }
    }

    /// Volume keys forwarded by the TV while System Audio Mode is on
    pub fn handle_user_control_pressed(&mut self, message: &CecMessage) -> bool {
        if !self.core.system_audio_on {
            return false;
        }
        let direction = match message.operands().first().copied().and_then(UiCommand::from_u8) {
            Some(UiCommand::VolumeUp) => VolumeDirection::Raise,
            Some(UiCommand::VolumeDown) => VolumeDirection::Lower,
            Some(UiCommand::Mute) => VolumeDirection::ToggleMute,
            None => return false,
        };
        self.core.audio.adjust_volume(direction);
        self.handle_give_audio_status(message)
    }

    pub fn handle_give_physical_address(&mut self, _message: &CecMessage) -> bool {
        self.announce();
        true
    }

    /// Broadcast `<Report Physical Address>` for this device
    pub fn announce(&mut self) {
        let local = self.local_address();
        let physical = self.core.settings.physical_address;
        self.core.send(CecMessage::report_physical_address(
            local,
            physical,
            DEVICE_TYPE_AUDIO_SYSTEM,
        ));
    }

    pub fn handle_give_device_power_status(&mut self, message: &CecMessage) -> bool {
        let status = match self.core.power_state {
            PowerState::Awake => PowerStatus::On,
            PowerState::Standby => PowerStatus::Standby,
        };
        self.core.reply(message, |src, dest| {
            CecMessage::report_power_status(src, dest, status)
        });
        true
    }

    pub fn handle_give_osd_name(&mut self, message: &CecMessage) -> bool {
        let name = self.core.settings.osd_name.clone();
        self.core
            .reply(message, |src, dest| CecMessage::set_osd_name(src, dest, &name));
        true
    }

    pub fn handle_get_cec_version(&mut self, message: &CecMessage) -> bool {
        self.core.reply(message, CecMessage::cec_version);
        true
    }

    pub fn handle_give_device_vendor_id(&mut self, _message: &CecMessage) -> bool {
        let local = self.local_address();
        let vendor_id = self.core.settings.vendor_id;
        self.core
            .send(CecMessage::device_vendor_id(local, vendor_id));
        true
    }

    /// `<Standby>` from the bus puts the whole device to sleep
    pub fn handle_standby(&mut self, _message: &CecMessage) -> bool {
        self.on_standby();
        self.core.power.standby();
        true
    }

    // =========================================================================
    // Power transitions
    // =========================================================================

    /// Entering standby
    ///
    /// If System Audio Mode is on it is turned off for the whole bus with a
    /// single best-effort broadcast, and local playback is muted.
    pub fn on_standby(&mut self) {
        info!("Entering standby");
        // Only the awake state counts as "last"; a repeated standby keeps it
        if self.core.power_state == PowerState::Awake {
            self.core.last_system_audio_on = self.core.system_audio_on;
        }
        self.actions.clear(&mut self.core);

        if self.core.system_audio_on {
            let local = self.local_address();
            self.core.send(CecMessage::set_system_audio_mode(
                local,
                LogicalAddress::BROADCAST,
                false,
            ));
            self.core.set_system_audio_mode(false);
        }
        self.core.power_state = PowerState::Standby;
    }

    fn on_power_on(&mut self) {
        info!("Powered on");
        self.core.wake();
        let policy = self.core.settings.power_on_policy;
        let last = self.core.last_system_audio_on;
        self.system_audio_control_on_power_on(policy, last);
    }

    /// Apply the power-on policy for System Audio Mode
    ///
    /// `AlwaysOn`, or `UseLastState` with the mode on before standby,
    /// (re)starts the initiation action. Anything else makes sure none runs.
    pub fn system_audio_control_on_power_on(
        &mut self,
        policy: PowerOnPolicy,
        was_last_state_on: bool,
    ) {
        let kind = ActionKind::SystemAudioInitiationFromAvr;
        self.actions.remove(kind, &mut self.core);

        if !self.core.settings.system_audio_control {
            debug!("System audio control disabled, power-on policy skipped");
            return;
        }
        let start = match policy {
            PowerOnPolicy::AlwaysOn => true,
            PowerOnPolicy::NeverOn => false,
            PowerOnPolicy::UseLastState => was_last_state_on,
        };
        debug!(?policy, was_last_state_on, start, "Power-on policy");
        if start {
            self.actions
                .start(Action::system_audio_initiation(LogicalAddress::TV), &mut self.core);
        }
    }

    /// Turn System Audio Mode on or off locally (mute coupling included)
    ///
    /// Turning it off drops a pending initiation so its timeout cannot turn
    /// the mode back on.
    pub fn set_system_audio_mode(&mut self, on: bool) {
        if !on {
            self.actions
                .remove(ActionKind::SystemAudioInitiationFromAvr, &mut self.core);
        }
        self.core.set_system_audio_mode(on);
    }

    /// Start the ARC initiation handshake with the TV
    pub fn initiate_arc(&mut self) {
        if !self.core.settings.arc_support {
            warn!("ARC support disabled, not initiating");
            return;
        }
        self.remove_arc_actions();
        self.actions
            .start(Action::arc_initiation(LogicalAddress::TV), &mut self.core);
    }

    pub fn terminate_arc(&mut self) {
        self.remove_arc_actions();
        self.actions
            .start(Action::arc_termination(LogicalAddress::TV), &mut self.core);
    }

    /// Drop both ARC handshakes; a stale one would overwrite the ARC flag
    fn remove_arc_actions(&mut self) {
        self.actions.remove(ActionKind::ArcInitiation, &mut self.core);
        self.actions.remove(ActionKind::ArcTermination, &mut self.core);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn settings(&self) -> &DeviceSettings {
        self.core.settings()
    }

    pub fn is_system_audio_mode_on(&self) -> bool {
        self.core.system_audio_on
    }

    pub fn is_arc_established(&self) -> bool {
        self.core.arc_established
    }

    pub fn active_source(&self) -> ActiveSource {
        self.core.active_source
    }

    pub fn power_state(&self) -> PowerState {
        self.core.power_state
    }

    pub fn actions(&self, kind: ActionKind) -> impl Iterator<Item = &Action> {
        self.actions.actions(kind)
    }

    pub fn has_action(&self, kind: ActionKind) -> bool {
        self.actions.has(kind)
    }

    /// Remove all actions of `kind`, cancelling their timers
    pub fn remove_action(&mut self, kind: ActionKind) {
        self.actions.remove(kind, &mut self.core);
    }

    pub fn volume_status(&self) -> Result<VolumeStatus> {
        VolumeStatus::read(&self.core.audio)
    }

    pub fn audio(&self) -> &A {
        &self.core.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.core.audio
    }

    pub fn bus(&self) -> &B {
        &self.core.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.core.bus
    }

    pub fn power(&self) -> &P {
        &self.core.power
    }
}
