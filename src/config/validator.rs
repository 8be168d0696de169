//! Settings validation, run once at startup.

use crate::config::Settings;
use crate::error::ConfigError;
use std::net::SocketAddr;

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if !settings.base_url.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "base_url must start with '/': {}",
            settings.base_url
        )));
    }
    if settings.base_url.contains(&['?', '#', '*', ':'][..]) {
        return Err(ConfigError::Validation(format!(
            "base_url must be a plain path: {}",
            settings.base_url
        )));
    }
    settings
        .bind
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::Validation(format!("bind '{}': {}", settings.bind, e)))?;
    if !settings.default_reload_interval.is_finite() {
        return Err(ConfigError::Validation("default_reload_interval must be finite".into()));
    }
    if !settings.root_dir.is_absolute() {
        return Err(ConfigError::Validation(format!(
            "root_dir must be absolute: {}",
            settings.root_dir.display()
        )));
    }
    if settings.max_body_bytes == 0 {
        return Err(ConfigError::Validation("max_body_bytes must be positive".into()));
    }
    Ok(())
}
