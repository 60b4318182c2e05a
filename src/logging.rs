//! Tracing subscriber setup.
//!
//! Logs go to stderr so command output on stdout stays clean. The filter
//! comes from `RUST_LOG`, falling back to `speclink=info`.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "speclink=info";

static SUBSCRIBER_GUARD: OnceLock<()> = OnceLock::new();

/// Build the filter from `RUST_LOG`, or from `DEFAULT_FILTER`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the global tracing subscriber.
///
/// The initialization is idempotent so that unit tests and binaries can call
/// it multiple times without panicking.
pub fn init_tracing(filter: EnvFilter) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    if SUBSCRIBER_GUARD.get().is_some() {
        return Ok(());
    }

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));
    tracing::subscriber::set_global_default(subscriber)?;
    SUBSCRIBER_GUARD.set(()).ok();

    Ok(())
}
