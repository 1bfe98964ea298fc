//! Per-opcode operand rules
//!
//! Each known opcode declares its operand count, its addressing mode and
//! an optional value check. Unknown opcodes accept anything that fits in a
//! frame.

use crate::cec::{AudioStatus, Opcode};
use crate::constants::{MAX_OPERANDS, PROTOCOL_VOLUME_MAX};

/// Where a message may be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    Directed,
    Broadcast,
    Either,
}

/// Operand shape of one opcode
pub struct Rule {
    pub min_operands: usize,
    pub max_operands: usize,
    pub addressing: Addressing,
    pub check: Option<fn(&[u8]) -> Result<(), &'static str>>,
}

fn rule(min: usize, max: usize, addressing: Addressing) -> Rule {
    Rule {
        min_operands: min,
        max_operands: max,
        addressing,
        check: None,
    }
}

fn checked(
    min: usize,
    max: usize,
    addressing: Addressing,
    check: fn(&[u8]) -> Result<(), &'static str>,
) -> Rule {
    Rule {
        min_operands: min,
        max_operands: max,
        addressing,
        check: Some(check),
    }
}

fn on_off(ops: &[u8]) -> Result<(), &'static str> {
    match ops[0] {
        0 | 1 => Ok(()),
        _ => Err("on/off operand must be 0 or 1"),
    }
}

fn audio_status(ops: &[u8]) -> Result<(), &'static str> {
    let status = AudioStatus::from_operand(ops[0]);
    if status.volume > PROTOCOL_VOLUME_MAX && status.is_volume_known() {
        return Err("volume must be 0..=100 or 0x7F");
    }
    Ok(())
}

fn power_status(ops: &[u8]) -> Result<(), &'static str> {
    if ops[0] > 3 {
        return Err("power status must be 0..=3");
    }
    Ok(())
}

fn abort_reason(ops: &[u8]) -> Result<(), &'static str> {
    if ops[1] > 5 {
        return Err("abort reason must be 0..=5");
    }
    Ok(())
}

fn optional_physical_address(ops: &[u8]) -> Result<(), &'static str> {
    if ops.len() == 1 {
        return Err("expected no operand or a 2-byte physical address");
    }
    Ok(())
}

fn printable(ops: &[u8]) -> Result<(), &'static str> {
    if !ops.iter().all(|b| (0x20..=0x7E).contains(b)) {
        return Err("OSD name must be printable ASCII");
    }
    Ok(())
}

/// Rule for `opcode`
pub fn rule_for(opcode: Opcode) -> Rule {
    use Addressing::{Broadcast, Directed, Either};

    match opcode {
        Opcode::FeatureAbort => checked(2, 2, Directed, abort_reason),
        Opcode::Standby => rule(0, 0, Either),
        Opcode::UserControlPressed => rule(1, 4, Directed),
        Opcode::UserControlReleased => rule(0, 0, Directed),
        Opcode::GiveOsdName => rule(0, 0, Directed),
        Opcode::SetOsdName => checked(1, 14, Directed, printable),
        Opcode::SystemAudioModeRequest => checked(0, 2, Directed, optional_physical_address),
        Opcode::GiveAudioStatus => rule(0, 0, Directed),
        Opcode::SetSystemAudioMode => checked(1, 1, Either, on_off),
        Opcode::ReportAudioStatus => checked(1, 1, Directed, audio_status),
        Opcode::GiveSystemAudioModeStatus => rule(0, 0, Directed),
        Opcode::SystemAudioModeStatus => checked(1, 1, Directed, on_off),
        Opcode::ActiveSource => rule(2, 2, Broadcast),
        Opcode::GivePhysicalAddress => rule(0, 0, Directed),
        Opcode::ReportPhysicalAddress => rule(3, 3, Broadcast),
        Opcode::RequestActiveSource => rule(0, 0, Broadcast),
        Opcode::DeviceVendorId => rule(3, 3, Broadcast),
        Opcode::GiveDeviceVendorId => rule(0, 0, Directed),
        Opcode::GiveDevicePowerStatus => rule(0, 0, Directed),
        Opcode::ReportPowerStatus => checked(1, 1, Directed, power_status),
        Opcode::CecVersion => rule(1, 1, Directed),
        Opcode::GetCecVersion => rule(0, 0, Directed),
        Opcode::InitiateArc
        | Opcode::ReportArcInitiated
        | Opcode::ReportArcTerminated
        | Opcode::RequestArcInitiation
        | Opcode::RequestArcTermination
        | Opcode::TerminateArc => rule(0, 0, Directed),
        Opcode::Abort => rule(0, 0, Directed),
        Opcode::Unknown(_) => rule(0, MAX_OPERANDS, Either),
    }
}
