//! Diagnostic tracing for the CLI.
//!
//! Command results go to stdout; tracing events go to stderr in compact
//! format so piped JSON output stays clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins, then the config file's `[log] filter`, then `warn`.
/// An unparsable config filter falls back to `warn` as well.
pub(crate) fn init(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| match config_filter {
            Some(directive) => EnvFilter::try_new(directive),
            None => Ok(EnvFilter::new("warn")),
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
