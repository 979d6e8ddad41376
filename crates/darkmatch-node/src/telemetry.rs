//! Tracing subscriber setup.

use darkmatch_types::{DarkmatchError, LoggingConfig, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.filter` when set.
///
/// # Errors
/// [`DarkmatchError::Configuration`] if the filter does not parse or a
/// global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = filter(config)?;
    let installed = if config.json {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };
    installed.map_err(|e| DarkmatchError::Configuration(format!("tracing: {e}")))
}

fn filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| DarkmatchError::Configuration(format!("logging.filter: {e}")))
}
