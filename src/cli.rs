//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// HDMI-CEC audio system daemon (System Audio Mode, ARC, volume)
#[derive(Parser, Debug, Default)]
#[command(name = "cec-audiod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: cec-audio.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// UDP port to receive CEC frames on (overrides config)
    #[arg(long, value_name = "PORT")]
    pub bind_port: Option<u16>,

    /// Address to send CEC frames to (overrides config)
    #[arg(long, value_name = "ADDR")]
    pub peer: Option<SocketAddr>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective configuration as TOML and exit
    PrintConfig,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Apply command-line overrides on top of the loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.bind_port {
            config.transport.bind_port = port;
        }
        if let Some(peer) = self.peer {
            config.transport.peer = Some(peer);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
