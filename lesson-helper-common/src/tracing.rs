//! Tracing initialization for the function servers.
//!
//! Filtering follows `RUST_LOG` (default `info`). Examples:
//!   - `RUST_LOG=debug` - debug logging everywhere
//!   - `RUST_LOG=lesson_helper_tutor=debug` - debug for the tutor only
//!   - `RUST_LOG=warn,lesson_helper_common=debug` - warn by default, debug for common
//!
//! Logs carry timestamp, level, target module, message and structured fields.
//! When serving over stdio, stdout belongs to the MCP protocol, so logs are
//! always written to stderr.

use std::io::{self, Stderr};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{
        self,
        format::{DefaultFields, FmtSpan, Format},
    },
    prelude::*,
};

/// Console formatting layer shared by every initialisation path.
pub(crate) type ConsoleLayer<S> = fmt::Layer<S, DefaultFields, Format, fn() -> Stderr>;

pub(crate) fn fmt_layer<S>() -> ConsoleLayer<S> {
    fmt::layer()
        .with_writer(io::stderr as fn() -> Stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
}

/// `RUST_LOG` filter, falling back to `default_level`.
pub(crate) fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    Registry::default().with(filter).with(fmt_layer())
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```no_run
/// use lesson_helper_common::tracing::init_tracing;
///
/// init_tracing();
/// tracing::info!("Server starting");
/// ```
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Initialize tracing with a custom default level used when `RUST_LOG` is unset.
pub fn init_tracing_with_default(default_level: &str) {
    subscriber(env_filter(default_level)).init();
}

/// Try to initialize tracing, returning an error if already initialized.
///
/// Unlike `init_tracing()`, this function does not panic if the subscriber
/// is already set, which makes it safe to call from tests.
pub fn try_init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    subscriber(env_filter("info")).try_init()
}
