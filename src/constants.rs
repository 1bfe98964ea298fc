//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

// =============================================================================
// Wire format
// =============================================================================

/// Maximum operand bytes in a single CEC frame
pub const MAX_OPERANDS: usize = 14;

/// Header byte + opcode byte
pub const FRAME_OVERHEAD: usize = 2;

/// Maximum encoded frame length
pub const MAX_FRAME_LEN: usize = FRAME_OVERHEAD + MAX_OPERANDS;

/// Maximum length of an OSD name
pub const MAX_OSD_NAME_LEN: usize = 14;

// =============================================================================
// Protocol values
// =============================================================================

/// `<CEC Version>` operand for CEC 1.4
pub const CEC_VERSION_1_4: u8 = 0x05;

/// Primary device type "Audio System" in `<Report Physical Address>`
pub const DEVICE_TYPE_AUDIO_SYSTEM: u8 = 0x05;

/// Volume operand meaning "volume unknown" in `<Report Audio Status>`
pub const AUDIO_VOLUME_UNKNOWN: u8 = 0x7F;

/// Upper bound of the protocol volume scale
pub const PROTOCOL_VOLUME_MAX: u8 = 100;

/// Level the software amplifier starts at, on the protocol scale
pub const INITIAL_PROTOCOL_VOLUME: u8 = 50;

// =============================================================================
// Actions
// =============================================================================

/// Default response timeout for in-flight actions (milliseconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 2000;

/// Default number of resends before an action gives up
pub const DEFAULT_ACTION_MAX_RETRIES: u32 = 2;

// =============================================================================
// Network
// =============================================================================

/// Default UDP port the daemon listens on for CEC frames
pub const DEFAULT_BIND_PORT: u16 = 9300;

/// Maximum socket bind retry attempts
pub const MAX_SOCKET_RETRY_ATTEMPTS: u32 = 5;

/// Base delay between retry attempts (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 200;

/// UDP receive buffer size
pub const UDP_BUFFER_SIZE: usize = 64;

/// Channel capacity for async message passing
pub const CHANNEL_CAPACITY: usize = 256;

/// Interval between shutdown flag checks in the dispatch loop (milliseconds)
pub const SHUTDOWN_POLL_MS: u64 = 100;
