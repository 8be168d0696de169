//! Load settings from an optional JSON file, then apply `LOGDIR_HUB_*` environment overrides.

use crate::config::types::Settings;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG: &str = "LOGDIR_HUB_CONFIG";
pub const ENV_ROOT_DIR: &str = "LOGDIR_HUB_ROOT_DIR";
pub const ENV_BIND: &str = "LOGDIR_HUB_BIND";
pub const ENV_BASE_URL: &str = "LOGDIR_HUB_BASE_URL";
pub const ENV_TOKEN: &str = "LOGDIR_HUB_TOKEN";
pub const ENV_RELOAD_INTERVAL: &str = "LOGDIR_HUB_RELOAD_INTERVAL";
pub const ENV_FILE_PATTERN: &str = "LOGDIR_HUB_FILE_PATTERN";

/// Settings from the process environment.
/// The root directory is made absolute against the working directory.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_with(|key| std::env::var(key).ok())
}

/// Same as [`load_settings`] with an injectable variable lookup.
pub fn load_settings_with<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match lookup(ENV_CONFIG).filter(|s| !s.is_empty()) {
        Some(path) => load_settings_file(Path::new(&path))?,
        None => Settings::default(),
    };

    if let Some(v) = lookup(ENV_ROOT_DIR) {
        settings.root_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup(ENV_BIND) {
        settings.bind = v;
    }
    if let Some(v) = lookup(ENV_BASE_URL) {
        settings.base_url = v;
    }
    if let Some(v) = lookup(ENV_TOKEN) {
        settings.token = Some(v).filter(|s| !s.is_empty());
    }
    if let Some(v) = lookup(ENV_RELOAD_INTERVAL) {
        settings.default_reload_interval = v
            .trim()
            .parse()
            .map_err(|_| {
                ConfigError::Load(format!("{}: not a number: {}", ENV_RELOAD_INTERVAL, v))
            })?;
    }
    if let Some(v) = lookup(ENV_FILE_PATTERN) {
        settings.file_pattern = v;
    }

    settings.root_dir = absolute_root(settings.root_dir)?;
    Ok(settings)
}

pub fn load_settings_file(path: &Path) -> Result<Settings, ConfigError> {
    tracing::debug!(path = %path.display(), "loading settings file");
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

fn absolute_root(root: PathBuf) -> Result<PathBuf, ConfigError> {
    if root.is_absolute() {
        return Ok(root);
    }
    let cwd =
        std::env::current_dir().map_err(|e| ConfigError::Load(format!("current dir: {}", e)))?;
    Ok(cwd.join(root))
}
