//! Centralized error types for the CEC audio controller
//!
//! All errors are represented by the `CecError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, CecError>`.
//!
//! Protocol-level variants (`MalformedMessage`, `InvalidRange`,
//! `ActionTimeout`) are always handled inside the controller and never
//! abort dispatch. The remaining variants belong to the host daemon.

use std::fmt;
use std::path::PathBuf;

/// All controller and daemon errors
#[derive(Debug)]
pub enum CecError {
    // === Protocol ===
    /// Frame violates the structural rules of its opcode
    MalformedMessage { opcode: Option<u8>, reason: String },
    /// Volume scaling requested with a non-positive maximum
    InvalidRange { max: i32 },
    /// Logical address outside the 4-bit range
    InvalidAddress { value: u8 },
    /// An action exhausted its retries without a response
    ActionTimeout {
        action: &'static str,
        retries: u32,
    },

    // === Network ===
    /// Failed to bind UDP socket
    UdpBind { port: u16, source: std::io::Error },

    // === Config ===
    /// Config file could not be read or written
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },

    // === Runtime ===
    /// Tokio runtime creation failed
    Runtime { source: std::io::Error },
}

impl CecError {
    /// Shorthand for a malformed frame with a known opcode
    pub(crate) fn malformed(opcode: u8, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            opcode: Some(opcode),
            reason: reason.into(),
        }
    }
}

impl std::error::Error for CecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UdpBind { source, .. }
            | Self::ConfigRead { source, .. }
            | Self::Runtime { source } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for CecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedMessage {
                opcode: Some(op),
                reason,
            } => write!(f, "Malformed message (opcode 0x{:02X}): {}", op, reason),
            Self::MalformedMessage {
                opcode: None,
                reason,
            } => write!(f, "Malformed message: {}", reason),
            Self::InvalidRange { max } => {
                write!(f, "Invalid volume range: max {} must be positive", max)
            }
            Self::InvalidAddress { value } => {
                write!(f, "Invalid logical address: {} (must be 0..=15)", value)
            }
            Self::ActionTimeout { action, retries } => {
                write!(f, "{} timed out after {} retries", action, retries)
            }
            Self::UdpBind { port, .. } => write!(f, "Cannot bind UDP port {}", port),
            Self::ConfigRead { path, .. } => write!(f, "Config IO error: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::Runtime { .. } => write!(f, "Failed to create runtime"),
        }
    }
}

/// Alias for Result with CecError
pub type Result<T> = std::result::Result<T, CecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_malformed_display_includes_opcode() {
        let err = CecError::malformed(0x7A, "expected 1 operand, got 0");
        assert_eq!(
            err.to_string(),
            "Malformed message (opcode 0x7A): expected 1 operand, got 0"
        );
    }

    #[test]
    fn test_io_errors_expose_source() {
        let err = CecError::UdpBind {
            port: 9300,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy"),
        };
        assert!(err.source().is_some());
        assert!(CecError::InvalidRange { max: 0 }.source().is_none());
    }
}
