//! Volume scaling between the local amplifier range and the 0-100 CEC scale

use crate::constants::PROTOCOL_VOLUME_MAX;
use crate::device::AudioCollaborator;
use crate::error::{CecError, Result};

/// Scale a raw amplifier level to the protocol's 0..=100 range
///
/// Integer floor of `level * 100 / max`. Levels outside `0..=max` are
/// clamped first, so the result is always in range and monotonic in
/// `raw_level`.
pub fn scale_to_protocol(raw_level: i32, raw_max: i32) -> Result<u8> {
    if raw_max <= 0 {
        return Err(CecError::InvalidRange { max: raw_max });
    }
    let level = i64::from(raw_level.clamp(0, raw_max));
    let scaled = level * i64::from(PROTOCOL_VOLUME_MAX) / i64::from(raw_max);
    Ok(scaled as u8)
}

/// Inverse of `scale_to_protocol` (floor), for setting absolute volume
pub fn scale_to_raw(protocol_level: u8, raw_max: i32) -> Result<i32> {
    if raw_max <= 0 {
        return Err(CecError::InvalidRange { max: raw_max });
    }
    let level = i64::from(protocol_level.min(PROTOCOL_VOLUME_MAX));
    Ok((level * i64::from(raw_max) / i64::from(PROTOCOL_VOLUME_MAX)) as i32)
}

/// Snapshot of the amplifier volume
///
/// Derived from the audio collaborator on demand, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStatus {
    pub raw_level: i32,
    pub raw_max: i32,
    pub scaled: u8,
    pub muted: bool,
}

impl VolumeStatus {
    pub fn read(audio: &impl AudioCollaborator) -> Result<Self> {
        let raw_level = audio.volume();
        let raw_max = audio.max_volume();
        Ok(Self {
            raw_level,
            raw_max,
            scaled: scale_to_protocol(raw_level, raw_max)?,
            muted: audio.is_muted(),
        })
    }
}
