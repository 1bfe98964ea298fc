//! In-process amplifier model used by the daemon

use crate::constants::INITIAL_PROTOCOL_VOLUME;
use crate::device::{AudioCollaborator, VolumeDirection};
use crate::volume::scale_to_raw;
use tracing::{info, warn};

/// Software amplifier with a raw range of `0..=max`
///
/// Starts unmuted at half volume. Volume keys move the level by roughly
/// 5% of the range.
#[derive(Debug, Clone)]
pub struct SoftwareAmplifier {
    level: i32,
    max: i32,
    muted: bool,
    step: i32,
}

impl SoftwareAmplifier {
    pub fn new(max: i32) -> Self {
        let level = match scale_to_raw(INITIAL_PROTOCOL_VOLUME, max) {
            Ok(level) => level,
            Err(e) => {
                warn!("Amplifier starts silent: {}", e);
                0
            }
        };
        Self {
            level,
            max,
            muted: false,
            step: (max / 20).max(1),
        }
    }

    pub fn set_volume(&mut self, level: i32) {
        self.level = level.clamp(0, self.max.max(0));
    }
}

impl AudioCollaborator for SoftwareAmplifier {
    fn volume(&self) -> i32 {
        self.level
    }

    fn max_volume(&self) -> i32 {
        self.max
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_mute(&mut self, muted: bool) {
        if self.muted != muted {
            info!(muted, "Amplifier mute");
        }
        self.muted = muted;
    }

    fn adjust_volume(&mut self, direction: VolumeDirection) {
        match direction {
            VolumeDirection::Raise => self.set_volume(self.level + self.step),
            VolumeDirection::Lower => self.set_volume(self.level - self.step),
            VolumeDirection::ToggleMute => self.set_mute(!self.muted),
        }
        info!(level = self.level, muted = self.muted, "Amplifier volume");
    }
}
