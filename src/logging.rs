//! Diagnostic logging setup.
//!
//! Logs go to **stderr** so stdout stays reserved for the result lines
//! (`Successfully generated ...`, the server URL). Verbosity follows
//! `RUST_LOG`, defaulting to `info` for this crate.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "question_aggregator=info,qagg=info";

/// Installs the global subscriber. Safe to call more than once.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .try_init();
}
