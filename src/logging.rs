//! Logging configuration using tracing
//!
//! Structured logging to stderr, so stdout stays free for the run report.
//! `RUST_LOG` takes precedence over the `--verbose` flag.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// Defaults to `info`, or `debug` when `verbose` is set.
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - Show debug and above
/// - `RUST_LOG=gh_jira_sync::integrations=trace` - Trace HTTP adapters only
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init(verbose: bool) -> crate::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(verbose),
        )
        .try_init()
        .map_err(|e| crate::SyncError::Config(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init(true);
}
