//! CEC message type and builders
//!
//! Operand layouts follow CEC 1.4; `<Report Audio Status>` carries the
//! mute flag in bit 7 and the volume in bits 0-6.

use super::address::{LogicalAddress, PhysicalAddress};
use super::opcode::{FeatureAbortReason, Opcode, PowerStatus, UiCommand};
use crate::constants::{AUDIO_VOLUME_UNKNOWN, CEC_VERSION_1_4, MAX_OSD_NAME_LEN};
use bytes::Bytes;
use std::fmt;

/// A single CEC message
///
/// Immutable once built. Equality compares every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CecMessage {
    source: LogicalAddress,
    destination: LogicalAddress,
    opcode: Opcode,
    operands: Bytes,
}

impl CecMessage {
    /// Build a message from parts
    ///
    /// No operand validation happens here; the codec validates on decode.
    pub fn new(
        source: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        operands: impl Into<Bytes>,
    ) -> Self {
        Self {
            source,
            destination,
            // Unknown(0x71) and GiveAudioStatus are the same wire opcode
            opcode: Opcode::from(u8::from(opcode)),
            operands: operands.into(),
        }
    }

    fn without_operands(src: LogicalAddress, dest: LogicalAddress, opcode: Opcode) -> Self {
        Self::new(src, dest, opcode, Bytes::new())
    }

    pub fn source(&self) -> LogicalAddress {
        self.source
    }

    pub fn destination(&self) -> LogicalAddress {
        self.destination
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> &[u8] {
        &self.operands
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }

    /// First operand interpreted as a boolean (on/off operands)
    pub(crate) fn bool_operand(&self) -> Option<bool> {
        self.operands.first().map(|&b| b != 0)
    }

    /// Physical address carried in the first two operand bytes
    pub(crate) fn physical_address_operand(&self) -> Option<PhysicalAddress> {
        match self.operands.get(..2) {
            Some(&[hi, lo]) => Some(PhysicalAddress::from_bytes([hi, lo])),
            _ => None,
        }
    }

    /// Opcode a `<Feature Abort>` refers to
    pub(crate) fn aborted_opcode(&self) -> Option<Opcode> {
        if self.opcode != Opcode::FeatureAbort {
            return None;
        }
        self.operands.first().map(|&b| Opcode::from(b))
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn feature_abort(
        src: LogicalAddress,
        dest: LogicalAddress,
        aborted: Opcode,
        reason: FeatureAbortReason,
    ) -> Self {
        Self::new(
            src,
            dest,
            Opcode::FeatureAbort,
            vec![u8::from(aborted), reason as u8],
        )
    }

    pub fn give_audio_status(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::GiveAudioStatus)
    }

    pub fn report_audio_status(
        src: LogicalAddress,
        dest: LogicalAddress,
        volume: u8,
        muted: bool,
    ) -> Self {
        let status = AudioStatus::new(volume, muted);
        Self::new(src, dest, Opcode::ReportAudioStatus, vec![status.to_operand()])
    }

    pub fn give_system_audio_mode_status(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::GiveSystemAudioModeStatus)
    }

    pub fn report_system_audio_mode(src: LogicalAddress, dest: LogicalAddress, on: bool) -> Self {
        Self::new(src, dest, Opcode::SystemAudioModeStatus, vec![u8::from(on)])
    }

    pub fn set_system_audio_mode(src: LogicalAddress, dest: LogicalAddress, on: bool) -> Self {
        Self::new(src, dest, Opcode::SetSystemAudioMode, vec![u8::from(on)])
    }

    /// `<System Audio Mode Request>`
    ///
    /// `Some(address)` requests the mode on for the source at `address`;
    /// `None` requests it off.
    pub fn system_audio_mode_request(
        src: LogicalAddress,
        dest: LogicalAddress,
        source_address: Option<PhysicalAddress>,
    ) -> Self {
        match source_address {
            Some(addr) => Self::new(
                src,
                dest,
                Opcode::SystemAudioModeRequest,
                addr.to_bytes().to_vec(),
            ),
            None => Self::without_operands(src, dest, Opcode::SystemAudioModeRequest),
        }
    }

    pub fn request_arc_initiation(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::RequestArcInitiation)
    }

    pub fn request_arc_termination(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::RequestArcTermination)
    }

    pub fn initiate_arc(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::InitiateArc)
    }

    pub fn terminate_arc(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::TerminateArc)
    }

    pub fn report_arc_initiated(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::ReportArcInitiated)
    }

    pub fn report_arc_terminated(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::ReportArcTerminated)
    }

    /// `<Active Source>` (always broadcast)
    pub fn active_source(src: LogicalAddress, physical_address: PhysicalAddress) -> Self {
        Self::new(
            src,
            LogicalAddress::BROADCAST,
            Opcode::ActiveSource,
            physical_address.to_bytes().to_vec(),
        )
    }

    /// `<Request Active Source>` (always broadcast)
    pub fn request_active_source(src: LogicalAddress) -> Self {
        Self::without_operands(src, LogicalAddress::BROADCAST, Opcode::RequestActiveSource)
    }

    pub fn give_physical_address(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::GivePhysicalAddress)
    }

    /// `<Report Physical Address>` (always broadcast)
    pub fn report_physical_address(
        src: LogicalAddress,
        physical_address: PhysicalAddress,
        device_type: u8,
    ) -> Self {
        let [hi, lo] = physical_address.to_bytes();
        Self::new(
            src,
            LogicalAddress::BROADCAST,
            Opcode::ReportPhysicalAddress,
            vec![hi, lo, device_type],
        )
    }

    pub fn give_device_power_status(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::GiveDevicePowerStatus)
    }

    pub fn report_power_status(
        src: LogicalAddress,
        dest: LogicalAddress,
        status: PowerStatus,
    ) -> Self {
        Self::new(src, dest, Opcode::ReportPowerStatus, vec![status as u8])
    }

    pub fn give_osd_name(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::GiveOsdName)
    }

    /// `<Set OSD Name>`; the name is truncated to 14 bytes
    pub fn set_osd_name(src: LogicalAddress, dest: LogicalAddress, name: &str) -> Self {
        let bytes: Vec<u8> = name
            .bytes()
            .filter(u8::is_ascii)
            .take(MAX_OSD_NAME_LEN)
            .collect();
        Self::new(src, dest, Opcode::SetOsdName, bytes)
    }

    pub fn get_cec_version(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::GetCecVersion)
    }

    pub fn cec_version(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::new(src, dest, Opcode::CecVersion, vec![CEC_VERSION_1_4])
    }

    pub fn give_device_vendor_id(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::GiveDeviceVendorId)
    }

    /// `<Device Vendor ID>` (always broadcast, 24-bit id)
    pub fn device_vendor_id(src: LogicalAddress, vendor_id: u32) -> Self {
        let [_, a, b, c] = vendor_id.to_be_bytes();
        Self::new(
            src,
            LogicalAddress::BROADCAST,
            Opcode::DeviceVendorId,
            vec![a, b, c],
        )
    }

    pub fn user_control_pressed(
        src: LogicalAddress,
        dest: LogicalAddress,
        command: UiCommand,
    ) -> Self {
        Self::new(src, dest, Opcode::UserControlPressed, vec![command as u8])
    }

    pub fn user_control_released(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::UserControlReleased)
    }

    pub fn standby(src: LogicalAddress, dest: LogicalAddress) -> Self {
        Self::without_operands(src, dest, Opcode::Standby)
    }
}

impl fmt::Display for CecMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> {}->{}", self.opcode, self.source, self.destination)?;
        for b in self.operands.iter() {
            write!(f, " {:02X}", b)?;
        }
        Ok(())
    }
}

/// Operand of `<Report Audio Status>`
///
/// Bit 7 is the mute flag, bits 0-6 the volume (0..=100, 0x7F = unknown),
/// as laid out by CEC 1.4 (Audio Status operand).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStatus {
    pub volume: u8,
    pub muted: bool,
}

impl AudioStatus {
    pub fn new(volume: u8, muted: bool) -> Self {
        Self {
            volume: volume & 0x7F,
            muted,
        }
    }

    pub fn to_operand(self) -> u8 {
        (u8::from(self.muted) << 7) | (self.volume & 0x7F)
    }

    pub fn from_operand(byte: u8) -> Self {
        Self {
            volume: byte & 0x7F,
            muted: byte & 0x80 != 0,
        }
    }

    pub fn is_volume_known(self) -> bool {
        self.volume != AUDIO_VOLUME_UNKNOWN
    }
}
