//! cec-audiod - HDMI-CEC audio system daemon
//!
//! Usage:
//!   cec-audiod                       Run with cec-audio.toml (or defaults)
//!   cec-audiod -c PATH -v            Run with a given config, debug output
//!   cec-audiod print-config          Print the effective config and exit
//!
//! On Unix, SIGUSR1 brings ARC up and SIGUSR2 tears it down.

use cec_audio::cli::{Cli, Command};
use cec_audio::config::{self, Config};
use cec_audio::constants::CHANNEL_CAPACITY;
use cec_audio::device::Event;
use cec_audio::error::{CecError, Result};
use cec_audio::host::{self, Stats};
use cec_audio::logging;
use clap::Parser;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = config::load(&cli.config_path());
    cli.apply_overrides(&mut config);
    config.validate()?;

    if let Some(Command::PrintConfig) = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new().map_err(|e| CecError::Runtime { source: e })?;
    rt.block_on(run_daemon(config))
}

async fn run_daemon(config: Config) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    spawn_signal_handlers(shutdown.clone(), command_tx);

    let stats = Arc::new(Stats::new());
    host::run(&config, command_rx, shutdown, stats).await
}

#[cfg(unix)]
fn spawn_signal_handlers(shutdown: Arc<AtomicBool>, commands: mpsc::Sender<Event>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let handlers = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        );
        let (Ok(mut sigterm), Ok(mut sigint), Ok(mut sigusr1), Ok(mut sigusr2)) = handlers else {
            tracing::warn!("Failed to install signal handlers, only Ctrl-C will stop the daemon");
            let _ = tokio::signal::ctrl_c().await;
            shutdown.store(true, Ordering::SeqCst);
            return;
        };

        loop {
            tokio::select! {
                _ = sigterm.recv() => break,
                _ = sigint.recv() => break,
                _ = sigusr1.recv() => {
                    let _ = commands.send(Event::InitiateArc).await;
                }
                _ = sigusr2.recv() => {
                    let _ = commands.send(Event::TerminateArc).await;
                }
            }
        }
        shutdown.store(true, Ordering::SeqCst);
    });
}

#[cfg(not(unix))]
fn spawn_signal_handlers(shutdown: Arc<AtomicBool>, _commands: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.store(true, Ordering::SeqCst);
    });
}
