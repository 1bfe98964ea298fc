//! Integration tests for the audio system device
//!
//! Drives the controller through its public API with recording
//! collaborators, then runs the host loop over a mock transport.

use bytes::Bytes;
use cec_audio::action::ActionKind;
use cec_audio::cec::{
    ActiveSource, CecMessage, FeatureAbortReason, LogicalAddress, Opcode, PhysicalAddress,
};
use cec_audio::config::Config;
use cec_audio::device::{
    AudioCollaborator, AudioSystemDevice, BusAdapter, DeviceSettings, Dispatch, Event,
    PowerCollaborator, PowerOnPolicy, PowerState, TimerId, VolumeDirection,
};
use cec_audio::error::Result;
use cec_audio::host::{Host, Stats};
use cec_audio::transport::{Transport, TransportChannels};
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const TV: LogicalAddress = LogicalAddress::TV;
const AUDIO: LogicalAddress = LogicalAddress::AUDIO_SYSTEM;
const PLAYER: LogicalAddress = LogicalAddress::PLAYBACK_1;
const BROADCAST: LogicalAddress = LogicalAddress::BROADCAST;

// =============================================================================
// Recording collaborators
// =============================================================================

#[derive(Debug)]
pub struct FakeAudio {
    volume: i32,
    max: i32,
    muted: bool,
}

impl AudioCollaborator for FakeAudio {
    fn volume(&self) -> i32 {
        self.volume
    }

    fn max_volume(&self) -> i32 {
        self.max
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn adjust_volume(&mut self, direction: VolumeDirection) {
        match direction {
            VolumeDirection::Raise => self.volume = (self.volume + 1).min(self.max),
            VolumeDirection::Lower => self.volume = (self.volume - 1).max(0),
            VolumeDirection::ToggleMute => self.muted = !self.muted,
        }
    }
}

/// Bus that records traffic and timers instead of sending
#[derive(Debug)]
pub struct FakeBus {
    sent: Vec<CecMessage>,
    pending: Vec<TimerId>,
    start: Instant,
}

impl FakeBus {
    fn take_sent(&mut self) -> Vec<CecMessage> {
        std::mem::take(&mut self.sent)
    }

    /// Most recently scheduled timer still pending
    fn last_timer(&self) -> Option<TimerId> {
        self.pending.last().copied()
    }
}

impl BusAdapter for FakeBus {
    fn send(&mut self, message: CecMessage) {
        self.sent.push(message);
    }

    fn schedule_after(&mut self, _delay: Duration, timer: TimerId) {
        self.pending.push(timer);
    }

    fn cancel(&mut self, timer: TimerId) {
        self.pending.retain(|t| *t != timer);
    }

    fn now(&self) -> Instant {
        self.start
    }
}

#[derive(Debug)]
pub struct FakePower {
    state: PowerState,
    wakes: u32,
}

impl PowerCollaborator for FakePower {
    fn wake(&mut self) {
        self.wakes += 1;
        self.state = PowerState::Awake;
    }

    fn standby(&mut self) {
        self.state = PowerState::Standby;
    }

    fn power_state(&self) -> PowerState {
        self.state
    }
}

type TestDevice = AudioSystemDevice<FakeAudio, FakeBus, FakePower>;

fn device_with(settings: DeviceSettings, volume: i32, max: i32, muted: bool) -> TestDevice {
    AudioSystemDevice::new(
        settings,
        FakeAudio { volume, max, muted },
        FakeBus {
            sent: Vec::new(),
            pending: Vec::new(),
            start: Instant::now(),
        },
        FakePower {
            state: PowerState::Awake,
            wakes: 0,
        },
    )
}

fn device() -> TestDevice {
    device_with(DeviceSettings::default(), 10, 20, false)
}

/// Deliver the device's latest pending timer
fn fire_last_timer(dev: &mut TestDevice) -> Dispatch {
    let timer = dev.bus().last_timer().expect("no pending timer");
    dev.bus_mut().pending.retain(|t| *t != timer);
    dev.handle_event(Event::Timeout(timer))
}

fn system_audio_status(dev: &mut TestDevice) -> bool {
    dev.handle_message(&CecMessage::give_system_audio_mode_status(TV, AUDIO));
    let reply = dev.bus_mut().take_sent().pop().expect("no status reply");
    assert_eq!(reply.opcode(), Opcode::SystemAudioModeStatus);
    reply.operands()[0] == 1
}

// =============================================================================
// Controller scenarios
// =============================================================================

#[test]
fn test_give_audio_status_reports_scaled_volume_and_mute() {
    let mut dev = device_with(DeviceSettings::default(), 10, 20, true);

    let dispatch = dev.handle_message(&CecMessage::give_audio_status(TV, AUDIO));

    assert_eq!(dispatch, Dispatch::Handled);
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::report_audio_status(AUDIO, TV, 50, true)]
    );
}

#[test]
fn test_set_system_audio_mode_unmutes_and_reports() {
    let mut dev = device_with(DeviceSettings::default(), 10, 20, true);
    assert!(!system_audio_status(&mut dev));

    let dispatch = dev.handle_message(&CecMessage::set_system_audio_mode(TV, AUDIO, true));

    assert_eq!(dispatch, Dispatch::Handled);
    // No reply of its own
    assert!(dev.bus().sent.is_empty());
    assert!(!dev.audio().muted);
    assert!(system_audio_status(&mut dev));
}

#[test]
fn test_set_system_audio_mode_off_mutes() {
    let mut dev = device();
    dev.set_system_audio_mode(true);

    dev.handle_message(&CecMessage::set_system_audio_mode(TV, BROADCAST, false));

    assert!(dev.audio().muted);
    assert!(!dev.is_system_audio_mode_on());
}

#[test]
fn test_system_audio_mode_request_off() {
    let mut dev = device();
    dev.set_system_audio_mode(true);

    let dispatch = dev.handle_message(&CecMessage::system_audio_mode_request(TV, AUDIO, None));

    assert_eq!(dispatch, Dispatch::Handled);
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::set_system_audio_mode(AUDIO, BROADCAST, false)]
    );
    assert!(!system_audio_status(&mut dev));
    assert!(dev.audio().muted);
}

#[test]
fn test_request_arc_initiation_emits_single_message() {
    let mut dev = device();

    dev.handle_message(&CecMessage::request_arc_initiation(TV, AUDIO));

    assert_eq!(dev.bus_mut().take_sent(), vec![CecMessage::initiate_arc(AUDIO, TV)]);
    assert!(dev.is_arc_established());
}

#[test]
fn test_request_arc_termination_emits_single_message() {
    let mut dev = device();
    dev.handle_message(&CecMessage::request_arc_initiation(TV, AUDIO));
    dev.bus_mut().take_sent();

    dev.handle_message(&CecMessage::request_arc_termination(TV, AUDIO));

    assert_eq!(dev.bus_mut().take_sent(), vec![CecMessage::terminate_arc(AUDIO, TV)]);
    assert!(!dev.is_arc_established());
}

#[test]
fn test_standby_with_system_audio_on() {
    let mut dev = device();
    dev.set_system_audio_mode(true);

    dev.on_standby();

    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::set_system_audio_mode(AUDIO, BROADCAST, false)]
    );
    assert!(dev.audio().muted);
    assert!(!dev.is_system_audio_mode_on());
    assert_eq!(dev.power_state(), PowerState::Standby);
}

#[test]
fn test_standby_with_system_audio_off_is_silent() {
    let mut dev = device();
    dev.on_standby();
    assert!(dev.bus().sent.is_empty());
    assert!(!dev.audio().muted);
}

#[test]
fn test_active_source_updates_state() {
    let mut dev = device();

    let dispatch =
        dev.handle_message(&CecMessage::active_source(PLAYER, PhysicalAddress::new(0x2100)));

    assert_eq!(dispatch, Dispatch::Handled);
    assert!(dev.bus().sent.is_empty());
    assert_eq!(
        dev.active_source(),
        ActiveSource::new(PLAYER, PhysicalAddress::new(0x2100))
    );
}

proptest! {
    #[test]
    fn prop_power_on_policy(policy_idx in 0usize..3, last_on in any::<bool>(), repeat in 1usize..3) {
        let policy = [PowerOnPolicy::AlwaysOn, PowerOnPolicy::NeverOn, PowerOnPolicy::UseLastState][policy_idx];
        let mut dev = device();

        for _ in 0..repeat {
            dev.system_audio_control_on_power_on(policy, last_on);
        }

        let expected = match policy {
            PowerOnPolicy::AlwaysOn => true,
            PowerOnPolicy::NeverOn => false,
            PowerOnPolicy::UseLastState => last_on,
        };
        prop_assert_eq!(dev.has_action(ActionKind::SystemAudioInitiationFromAvr), expected);
        prop_assert!(dev.actions(ActionKind::SystemAudioInitiationFromAvr).count() <= 1);
    }
}

#[test]
fn test_never_on_removes_running_initiation() {
    let mut dev = device();
    dev.system_audio_control_on_power_on(PowerOnPolicy::AlwaysOn, false);
    let timer = dev.bus().last_timer().unwrap();

    dev.system_audio_control_on_power_on(PowerOnPolicy::NeverOn, false);

    assert!(!dev.has_action(ActionKind::SystemAudioInitiationFromAvr));
    assert!(!dev.bus().pending.contains(&timer));
    assert_eq!(dev.handle_event(Event::Timeout(timer)), Dispatch::Ignored);
}

// =============================================================================
// System Audio Mode initiation flow
// =============================================================================

#[test]
fn test_initiation_with_silent_tv_turns_mode_on() {
    let mut dev = device_with(DeviceSettings::default(), 10, 20, true);
    dev.system_audio_control_on_power_on(PowerOnPolicy::AlwaysOn, false);
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::request_active_source(AUDIO)]
    );

    // The active source answers; consumed by the action but still recorded
    let reply = CecMessage::active_source(PLAYER, PhysicalAddress::new(0x2000));
    assert_eq!(dev.handle_message(&reply), Dispatch::Handled);
    assert_eq!(
        dev.active_source(),
        ActiveSource::new(PLAYER, PhysicalAddress::new(0x2000))
    );
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::set_system_audio_mode(AUDIO, TV, true)]
    );

    // No feature abort before the timeout: the TV supports it
    assert_eq!(fire_last_timer(&mut dev), Dispatch::Handled);
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::set_system_audio_mode(AUDIO, BROADCAST, true)]
    );
    assert!(dev.is_system_audio_mode_on());
    assert!(!dev.audio().muted);
    assert!(!dev.has_action(ActionKind::SystemAudioInitiationFromAvr));
    assert!(dev.bus().pending.is_empty());
}

#[test]
fn test_initiation_refused_by_tv() {
    let mut dev = device();
    dev.handle_message(&CecMessage::active_source(PLAYER, PhysicalAddress::new(0x2000)));
    dev.system_audio_control_on_power_on(PowerOnPolicy::AlwaysOn, false);
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::set_system_audio_mode(AUDIO, TV, true)]
    );

    let abort = CecMessage::feature_abort(
        TV,
        AUDIO,
        Opcode::SetSystemAudioMode,
        FeatureAbortReason::UnrecognizedOpcode,
    );
    assert_eq!(dev.handle_message(&abort), Dispatch::Handled);

    assert!(!dev.is_system_audio_mode_on());
    assert!(!dev.has_action(ActionKind::SystemAudioInitiationFromAvr));
    assert!(dev.bus().pending.is_empty());
}

#[test]
fn test_initiation_without_active_source_retries_then_continues() {
    let mut dev = device();
    dev.system_audio_control_on_power_on(PowerOnPolicy::AlwaysOn, false);

    // Default policy: two resends of <Request Active Source>
    fire_last_timer(&mut dev);
    fire_last_timer(&mut dev);
    let sent = dev.bus_mut().take_sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.opcode() == Opcode::RequestActiveSource));

    // Give up waiting, go ask the TV
    fire_last_timer(&mut dev);
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![CecMessage::set_system_audio_mode(AUDIO, TV, true)]
    );
    assert_eq!(dev.active_source(), ActiveSource::NONE);
    assert!(dev.has_action(ActionKind::SystemAudioInitiationFromAvr));
}

#[test]
fn test_power_cycle_restores_system_audio() {
    let mut dev = device();
    dev.set_system_audio_mode(true);
    dev.handle_event(Event::Standby);
    dev.bus_mut().take_sent();

    dev.handle_event(Event::PowerOn);

    assert_eq!(dev.power_state(), PowerState::Awake);
    assert_eq!(dev.power().wakes, 1);
    assert!(dev.has_action(ActionKind::SystemAudioInitiationFromAvr));
}

#[test]
fn test_standby_cancels_actions() {
    let mut dev = device();
    dev.handle_event(Event::InitiateArc);
    assert!(dev.has_action(ActionKind::ArcInitiation));

    dev.handle_event(Event::Standby);

    assert!(!dev.has_action(ActionKind::ArcInitiation));
    assert!(dev.bus().pending.is_empty());
}

// =============================================================================
// ARC actions
// =============================================================================

#[test]
fn test_arc_initiation_times_out_after_retries() {
    let mut dev = device();
    dev.handle_event(Event::InitiateArc);

    for _ in 0..3 {
        assert_eq!(fire_last_timer(&mut dev), Dispatch::Handled);
    }

    let sent = dev.bus_mut().take_sent();
    assert_eq!(sent, vec![CecMessage::initiate_arc(AUDIO, TV); 3]);
    assert!(!dev.is_arc_established());
    assert!(!dev.has_action(ActionKind::ArcInitiation));
}

#[test]
fn test_arc_termination_after_initiation() {
    let mut dev = device();
    dev.handle_event(Event::InitiateArc);
    dev.handle_message(&CecMessage::report_arc_initiated(TV, AUDIO));
    assert!(dev.is_arc_established());

    dev.handle_event(Event::TerminateArc);
    dev.handle_message(&CecMessage::report_arc_terminated(TV, AUDIO));

    assert!(!dev.is_arc_established());
    assert!(!dev.has_action(ActionKind::ArcTermination));
    assert_eq!(
        dev.bus_mut().take_sent(),
        vec![
            CecMessage::initiate_arc(AUDIO, TV),
            CecMessage::terminate_arc(AUDIO, TV),
        ]
    );
}

#[test]
fn test_malformed_frames_do_not_stop_dispatch() {
    let mut dev = device();

    assert_eq!(dev.handle_frame(&[]), Dispatch::Ignored);
    assert_eq!(dev.handle_frame(&[0x05, 0x7A]), Dispatch::Ignored);
    assert_eq!(dev.handle_frame(&[0x05, 0x71]), Dispatch::Handled);
    assert_eq!(dev.bus().sent.len(), 1);
}

// =============================================================================
// Mock Transport
// =============================================================================

/// Mock transport for running the host loop without real I/O
pub struct MockTransport {
    /// Frames delivered to the host (simulates the bus)
    rx_data: Vec<Bytes>,
    /// Frames the host sent
    tx_captured: Arc<tokio::sync::Mutex<Vec<Bytes>>>,
}

impl MockTransport {
    pub fn new(rx_data: Vec<Bytes>) -> Self {
        Self {
            rx_data,
            tx_captured: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn captured(&self) -> Arc<tokio::sync::Mutex<Vec<Bytes>>> {
        self.tx_captured.clone()
    }
}

impl Transport for MockTransport {
    fn spawn(self, _shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let (tx_to_host, rx_from_mock) = mpsc::channel::<Bytes>(16);
        let (tx_from_host, mut rx_to_capture) = mpsc::channel::<Bytes>(16);

        let tx_captured = self.tx_captured.clone();
        tokio::spawn(async move {
            while let Some(data) = rx_to_capture.recv().await {
                tx_captured.lock().await.push(data);
            }
        });

        // Keep the sender alive so the loop only stops on shutdown
        let rx_data = self.rx_data;
        tokio::spawn(async move {
            for data in rx_data {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if tx_to_host.send(data).await.is_err() {
                    return;
                }
            }
            tx_to_host.closed().await;
        });

        Ok(TransportChannels {
            rx: rx_from_mock,
            tx: tx_from_host,
        })
    }
}

async fn run_host(config: Config, frames: Vec<Bytes>, commands: Vec<Event>) -> Vec<Bytes> {
    let mock = MockTransport::new(frames);
    let captured = mock.captured();
    let shutdown = Arc::new(AtomicBool::new(false));
    let channels = mock.spawn(shutdown.clone()).unwrap();
    let (cmd_tx, cmd_rx) = mpsc::channel(8);

    let host = Host::new(&config, channels, cmd_rx, Arc::new(Stats::new()));
    let task = tokio::spawn(host.run(shutdown.clone()));

    for command in commands {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cmd_tx.send(command).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.store(true, Ordering::SeqCst);
    task.await.unwrap().unwrap();

    let frames = captured.lock().await.clone();
    frames
}

// =============================================================================
// Host loop
// =============================================================================

#[tokio::test]
async fn test_host_answers_tv_queries() {
    let frames = run_host(
        Config::default(),
        vec![
            // <Give Audio Status>, <Give System Audio Mode Status>
            Bytes::from_static(&[0x05, 0x71]),
            Bytes::from_static(&[0x05, 0x7D]),
        ],
        Vec::new(),
    )
    .await;

    assert_eq!(
        frames,
        vec![
            Bytes::from_static(&[0x5F, 0x84, 0x10, 0x00, 0x05]),
            Bytes::from_static(&[0x50, 0x7A, 50]),
            Bytes::from_static(&[0x50, 0x7E, 0x00]),
        ]
    );
}

#[tokio::test]
async fn test_host_system_audio_request_round_trip() {
    let frames = run_host(
        Config::default(),
        vec![
            // <System Audio Mode Request>[2.0.0.0] then status query
            Bytes::from_static(&[0x05, 0x70, 0x20, 0x00]),
            Bytes::from_static(&[0x05, 0x7D]),
        ],
        Vec::new(),
    )
    .await;

    assert_eq!(frames[1], Bytes::from_static(&[0x5F, 0x72, 0x01]));
    assert_eq!(frames[2], Bytes::from_static(&[0x50, 0x7E, 0x01]));
}

#[tokio::test]
async fn test_host_arc_command_sends_initiate() {
    let frames = run_host(Config::default(), Vec::new(), vec![Event::InitiateArc]).await;

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1], Bytes::from_static(&[0x50, 0xC0]));
}

#[tokio::test]
async fn test_host_power_on_policy_always_on() {
    let mut config = Config::default();
    config.device.power_on_policy = PowerOnPolicy::AlwaysOn;

    let frames = run_host(config, Vec::new(), Vec::new()).await;

    // Announce, then <Request Active Source> from the initiation action
    assert_eq!(frames[1], Bytes::from_static(&[0x5F, 0x85]));
}
