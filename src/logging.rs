#![forbid(unsafe_code)]

//! Diagnostics for the archive tools, written to stderr.
//!
//! The filter comes from `RUST_LOG` and defaults to `info`, so the archive
//! load count is visible without any setup. The binaries keep their banner
//! and summary on stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info";

pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
