//! CEC opcodes
//!
//! Only the opcodes the audio system speaks are named; everything else
//! decodes to `Opcode::Unknown` so it can be reported as not handled.

use std::fmt;

macro_rules! opcodes {
    ($( $(#[$doc:meta])* $name:ident = $value:expr ),* $(,)?) => {
        /// Message opcode (second byte of a frame)
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $( $(#[$doc])* $name, )*
            /// Opcode this device does not know about
            Unknown(u8),
        }

        impl From<u8> for Opcode {
            fn from(value: u8) -> Self {
                match value {
                    $( $value => Self::$name, )*
                    other => Self::Unknown(other),
                }
            }
        }

        impl From<Opcode> for u8 {
            fn from(op: Opcode) -> Self {
                match op {
                    $( Opcode::$name => $value, )*
                    Opcode::Unknown(other) => other,
                }
            }
        }

        impl Opcode {
            /// Human-readable name for logs
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name), )*
                    Self::Unknown(_) => "Unknown",
                }
            }
        }
    };
}

opcodes! {
    FeatureAbort = 0x00,
    Standby = 0x36,
    UserControlPressed = 0x44,
    UserControlReleased = 0x45,
    GiveOsdName = 0x46,
    SetOsdName = 0x47,
    SystemAudioModeRequest = 0x70,
    GiveAudioStatus = 0x71,
    SetSystemAudioMode = 0x72,
    ReportAudioStatus = 0x7A,
    GiveSystemAudioModeStatus = 0x7D,
    /// `<System Audio Mode Status>`, the reply to a status query
    SystemAudioModeStatus = 0x7E,
    ActiveSource = 0x82,
    GivePhysicalAddress = 0x83,
    ReportPhysicalAddress = 0x84,
    RequestActiveSource = 0x85,
    DeviceVendorId = 0x87,
    GiveDeviceVendorId = 0x8C,
    GiveDevicePowerStatus = 0x8F,
    ReportPowerStatus = 0x90,
    CecVersion = 0x9E,
    GetCecVersion = 0x9F,
    InitiateArc = 0xC0,
    ReportArcInitiated = 0xC1,
    ReportArcTerminated = 0xC2,
    RequestArcInitiation = 0xC3,
    RequestArcTermination = 0xC4,
    TerminateArc = 0xC5,
    Abort = 0xFF,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(v) => write!(f, "Unknown(0x{:02X})", v),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Reason operand of `<Feature Abort>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FeatureAbortReason {
    UnrecognizedOpcode = 0,
    NotInCorrectMode = 1,
    CannotProvideSource = 2,
    InvalidOperand = 3,
    Refused = 4,
    UnableToDetermine = 5,
}

impl FeatureAbortReason {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::UnrecognizedOpcode,
            1 => Self::NotInCorrectMode,
            2 => Self::CannotProvideSource,
            3 => Self::InvalidOperand,
            4 => Self::Refused,
            5 => Self::UnableToDetermine,
            _ => return None,
        })
    }
}

/// `<User Control Pressed>` commands the audio system reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UiCommand {
    VolumeUp = 0x41,
    VolumeDown = 0x42,
    Mute = 0x43,
}

impl UiCommand {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x41 => Some(Self::VolumeUp),
            0x42 => Some(Self::VolumeDown),
            0x43 => Some(Self::Mute),
            _ => None,
        }
    }
}

/// Power status operand of `<Report Power Status>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerStatus {
    On = 0,
    Standby = 1,
    TransientToOn = 2,
    TransientToStandby = 3,
}
