//! Tracing subscriber installation.
//!
//! Events go to stdout through a mutex, so a multi-line event (the index dump,
//! a fault's error chain) is written in one piece and never interleaves with
//! another request's lines.

use std::io::{self, IsTerminal};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ServerConfig;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Install the global subscriber on first call; later calls are no-ops.
pub fn initialise(config: &ServerConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn filter_for(config: &ServerConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(config.log_filter())
            .map_err(|error| TelemetryError::Filter(error.to_string())),
    }
}

fn install_subscriber(config: &ServerConfig) -> Result<(), TelemetryError> {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter_for(config)?)
        .with_target(false)
        .with_level(true)
        .with_writer(Mutex::new(io::stdout()))
        .with_ansi(io::stdout().is_terminal())
        .finish();

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
