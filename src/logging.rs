//! Diagnostics for the command-line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. Output goes to stderr so stdout stays clean for markup and
//! JSON.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `warn`, or `debug` for
/// this crate with `verbose`.
pub fn init(verbose: bool) {
    let fallback = if verbose { "warn,html_patcher=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
