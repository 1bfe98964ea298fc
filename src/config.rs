//! Configuration management
//!
//! A single TOML file, `cec-audio.toml` by default. Every section and field
//! is optional; anything missing takes its default.

use crate::cec::{LogicalAddress, PhysicalAddress};
use crate::constants::{
    DEFAULT_ACTION_MAX_RETRIES, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_BIND_PORT,
};
use crate::device::PowerOnPolicy;
use crate::error::{CecError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tracing::warn;

/// Default config file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cec-audio.toml";

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub actions: ActionsConfig,
    pub transport: TransportConfig,
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity and feature switches of the local audio system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Logical address on the bus (5 = audio system)
    pub logical_address: LogicalAddress,
    /// Physical address as "a.b.c.d"
    pub physical_address: PhysicalAddress,
    /// Name reported by `<Set OSD Name>` (14 ASCII chars max on the wire)
    pub osd_name: String,
    /// 24-bit IEEE OUI
    pub vendor_id: u32,
    /// System Audio Mode behavior at power-on
    pub power_on_policy: PowerOnPolicy,
    pub system_audio_control: bool,
    pub arc_support: bool,
    /// Raw range of the software amplifier (0..=max_volume)
    pub max_volume: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            logical_address: LogicalAddress::AUDIO_SYSTEM,
            physical_address: PhysicalAddress::new(0x1000),
            osd_name: "Audio System".to_string(),
            vendor_id: 0,
            power_on_policy: PowerOnPolicy::UseLastState,
            system_audio_control: true,
            arc_support: true,
            max_volume: 100,
        }
    }
}

// =============================================================================
// Actions Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Response timeout per attempt
    pub timeout_ms: u64,
    /// Resends after the first attempt
    pub max_retries: u32,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            max_retries: DEFAULT_ACTION_MAX_RETRIES,
        }
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Local UDP port frames are received on
    pub bind_port: u16,
    /// Where to send frames; defaults to the last sender
    pub peer: Option<SocketAddr>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_port: DEFAULT_BIND_PORT,
            peer: None,
        }
    }
}

impl Config {
    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.device.logical_address.is_broadcast() {
            return Err(CecError::ConfigValidation {
                field: "device.logical_address",
                reason: "broadcast address cannot be used by a device".into(),
            });
        }
        if !self.device.physical_address.is_valid() {
            return Err(CecError::ConfigValidation {
                field: "device.physical_address",
                reason: format!("{} is not a valid address", self.device.physical_address),
            });
        }
        if self.device.vendor_id > 0x00FF_FFFF {
            return Err(CecError::ConfigValidation {
                field: "device.vendor_id",
                reason: format!("0x{:X} does not fit in 24 bits", self.device.vendor_id),
            });
        }
        if self.device.max_volume <= 0 {
            return Err(CecError::ConfigValidation {
                field: "device.max_volume",
                reason: "must be positive".into(),
            });
        }
        if self.actions.timeout_ms == 0 {
            return Err(CecError::ConfigValidation {
                field: "actions.timeout_ms",
                reason: "must be non-zero".into(),
            });
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CecError::ConfigValidation {
            field: "config",
            reason: e.to_string(),
        })
    }
}

/// Load config from file, falling back to defaults
pub fn load(path: &Path) -> Config {
    if !path.exists() {
        warn!("Config {:?} not found, using defaults", path);
        return Config::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config parse error in {:?}: {}, using defaults", path, e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config {:?}: {}, using defaults", path, e);
            Config::default()
        }
    }
}

/// Save config to file
pub fn save(config: &Config, path: &Path) -> Result<()> {
    let content = config.to_toml()?;
    fs::write(path, content).map_err(|e| CecError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })
}

// ============================================================================
// Tests
// ============================================================================
