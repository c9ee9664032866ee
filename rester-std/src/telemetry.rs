//! Process-wide `tracing` subscriber.
//!
//! Filtering follows `RUST_LOG` and defaults to `info`. Development mode
//! writes compact human-readable lines; every other mode writes JSON lines.

use crate::settings::Settings;
use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::ParseError,
    fmt::layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

const DEFAULT_FILTER: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed in this process.
    #[error("tracing subscriber already initialised: {0}")]
    AlreadyInitialised(#[from] TryInitError),

    /// The filter directives could not be parsed.
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
}

/// Install the global subscriber for the configured mode.
pub fn init_tracing(settings: &Settings) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_FILTER)?,
    };

    let output = if settings.mode().is_development() {
        layer().compact().boxed()
    } else {
        layer().json().with_ansi(false).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()?;
    tracing::debug!(mode = ?settings.mode(), "tracing initialised");
    Ok(())
}
