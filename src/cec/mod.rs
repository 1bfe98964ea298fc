//! CEC protocol vocabulary
//!
//! - `address` - logical and physical bus addresses
//! - `opcode` - opcodes and small operand enums
//! - `message` - the immutable `CecMessage` and its builders

pub mod address;
pub mod message;
pub mod opcode;

pub use address::{LogicalAddress, PhysicalAddress};
pub use message::{AudioStatus, CecMessage};
pub use opcode::{FeatureAbortReason, Opcode, PowerStatus, UiCommand};

/// Currently active source on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSource {
    pub logical_address: Option<LogicalAddress>,
    pub physical_address: PhysicalAddress,
}

impl ActiveSource {
    /// No active source known
    pub const NONE: Self = Self {
        logical_address: None,
        physical_address: PhysicalAddress::INVALID,
    };

    pub fn new(logical_address: LogicalAddress, physical_address: PhysicalAddress) -> Self {
        Self {
            logical_address: Some(logical_address),
            physical_address,
        }
    }

    pub fn is_known(&self) -> bool {
        self.logical_address.is_some() && self.physical_address.is_valid()
    }
}

impl Default for ActiveSource {
    fn default() -> Self {
        Self::NONE
    }
}
