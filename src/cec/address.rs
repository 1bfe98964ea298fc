//! Bus addressing
//!
//! Logical addresses identify a device on the CEC bus (4 bits).
//! Physical addresses locate a device in the HDMI topology (`a.b.c.d`).

use crate::error::{CecError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 4-bit logical address of a device on the bus
///
/// Value 15 plays two roles: `UNREGISTERED` when used as a source and
/// `BROADCAST` when used as a destination. It is never a real device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LogicalAddress(u8);

impl LogicalAddress {
    pub const TV: Self = Self(0);
    pub const RECORDING_1: Self = Self(1);
    pub const RECORDING_2: Self = Self(2);
    pub const TUNER_1: Self = Self(3);
    pub const PLAYBACK_1: Self = Self(4);
    pub const AUDIO_SYSTEM: Self = Self(5);
    pub const TUNER_2: Self = Self(6);
    pub const PLAYBACK_2: Self = Self(8);
    pub const SPECIFIC_USE: Self = Self(14);
    pub const UNREGISTERED: Self = Self(15);
    pub const BROADCAST: Self = Self(15);

    /// Create from a raw nibble
    pub fn new(value: u8) -> Result<Self> {
        if value > 0x0F {
            return Err(CecError::InvalidAddress { value });
        }
        Ok(Self(value))
    }

    /// Build from the low nibble of a byte (always valid)
    pub(crate) fn from_nibble(value: u8) -> Self {
        Self(value & 0x0F)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_broadcast(self) -> bool {
        self.0 == 0x0F
    }
}

impl TryFrom<u8> for LogicalAddress {
    type Error = CecError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalAddress> for u8 {
    fn from(addr: LogicalAddress) -> Self {
        addr.0
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "TV"),
            5 => write!(f, "AudioSystem"),
            15 => write!(f, "Broadcast"),
            n => write!(f, "L{}", n),
        }
    }
}

/// HDMI physical address (`a.b.c.d`, one nibble each)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhysicalAddress(u16);

impl PhysicalAddress {
    /// Root of the topology (the TV)
    pub const ROOT: Self = Self(0x0000);
    /// "No address" marker used by the protocol
    pub const INVALID: Self = Self(0xFFFF);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{}.{}.{}.{}",
            (v >> 12) & 0xF,
            (v >> 8) & 0xF,
            (v >> 4) & 0xF,
            v & 0xF
        )
    }
}

impl FromStr for PhysicalAddress {
    type Err = CecError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CecError::ConfigValidation {
            field: "physical_address",
            reason: format!("'{}' is not of the form a.b.c.d", s),
        };

        let mut raw: u16 = 0;
        let mut count = 0;
        for part in s.split('.') {
            let nibble = u8::from_str_radix(part.trim(), 16).map_err(|_| invalid())?;
            if nibble > 0xF || count == 4 {
                return Err(invalid());
            }
            raw = (raw << 4) | u16::from(nibble);
            count += 1;
        }
        if count != 4 {
            return Err(invalid());
        }
        Ok(Self(raw))
    }
}

impl TryFrom<String> for PhysicalAddress {
    type Error = CecError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PhysicalAddress> for String {
    fn from(addr: PhysicalAddress) -> Self {
        addr.to_string()
    }
}
