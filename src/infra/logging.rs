//! Structured logging for the chat client. Events carry stable `code`
//! fields so poll and pipeline failures can be grepped in output.

use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::AppError};

/// Installs the fmt subscriber. `RUST_LOG` wins when set; otherwise the
/// `[logging] level` from the config file applies, falling back to `info`
/// when that directive does not parse.
pub fn init(config: &LogConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(AppError::LoggingInit)
}
