//! Diagnostic tracing for the wrapper.
//!
//! Tracing goes to stderr and is independent of the status report printed on
//! stdout (see [`crate::report`]).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` with `verbose`, else `warn`.
///
/// # Example
/// ```bash
/// RUST_LOG=polecat=trace polecat "Fix typo in README"
/// ```
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
