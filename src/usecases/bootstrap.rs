//! Startup wiring: config then logging, in that order.

use std::path::Path;

use crate::infra::{config, config::AppConfig, error::AppError, logging};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config = config::load(config_path)?;
    logging::init(&config.logging)?;
    Ok(config)
}
