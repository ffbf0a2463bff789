//! Observability capability injected into the ledger and the normalizer.
//!
//! The core only ever talks to an [`ObservabilitySink`]; what happens to the
//! spans (nothing, `tracing` output, in-memory capture) is the caller's choice.

mod recording;
mod span;
mod tracing_sink;

pub use recording::*;
pub use span::*;
pub use tracing_sink::*;

use tracing_subscriber::EnvFilter;

/// Initialize process-wide logging.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over `warn`.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so command output on stdout stays scriptable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
