//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Builds the env filter: `RUST_LOG` wins over the configured level.
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns `Error::Config` if the format is unknown or a global subscriber
/// is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    match config.format.as_str() {
        "text" => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init(),
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        other => return Err(Error::Config(format!("unknown log format '{other}'"))),
    }
    .map_err(|e| Error::Config(format!("failed to install tracing subscriber: {e}")))
}
