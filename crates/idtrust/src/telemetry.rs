//! Tracing subscriber setup for binaries embedding the library
//!
//! Library code only emits events; installing a subscriber is left to the
//! application, which may call [`init_tracing`] once at startup.

use tracing::info;
use tracing_subscriber::{
    Registry, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::IdentityError;
use crate::settings::LoggingSettings;

/// Installs the global subscriber
///
/// `RUST_LOG` takes precedence over [`LoggingSettings::level`].
///
/// # Errors
///
/// [`IdentityError::Telemetry`] for an invalid filter directive or when a global
/// subscriber is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), IdentityError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| IdentityError::Telemetry(format!("invalid log level: {e}")))?;

    let result = if settings.json {
        Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true).json())
            .try_init()
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };
    result.map_err(|e| IdentityError::Telemetry(e.to_string()))?;

    info!(level = %settings.level, json = settings.json, "Tracing initialized");
    Ok(())
}
