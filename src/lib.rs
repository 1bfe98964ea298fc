//! HDMI-CEC audio system local device
//!
//! Implements the audio system (amplifier / soundbar) side of CEC:
//! - System Audio Mode negotiation and its mute coupling
//! - Audio Return Channel bring-up and tear-down
//! - Volume and mute reporting on the 0-100 protocol scale
//!
//! Layout:
//! - `cec` / `codec` - protocol vocabulary and frame codec
//! - `device` / `action` - the controller and its in-flight exchanges
//! - `host` / `transport` - the daemon around it

pub mod action;
pub mod cec;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod host;
pub mod logging;
pub mod transport;
pub mod volume;
