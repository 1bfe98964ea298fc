//! Tracing setup for the daemon

/// Initialize tracing output
///
/// Call early in main() before any logging occurs.
/// `verbose` switches from info to debug level; `RUST_LOG` is not consulted.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level(verbose)))
        .try_init();
}

fn level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}
