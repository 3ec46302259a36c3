//! Tracing setup for the watcher.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: run diagnostics and state transitions via
//!   `RUST_LOG`, output to stderr.
//!
//! - **Lobby reports ([`crate::report`])**: product output on stdout. Always
//!   printed, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset — every engine transition
/// (new identifier, issue, retry, exhaustion, restart) is user-visible.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=watcher=debug lobbywatch run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
