//! Server settings as read from the optional JSON config file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default file pattern: TensorFlow-style event files.
pub const DEFAULT_FILE_PATTERN: &str = r"tfevents";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Relative log directories are resolved against this root. Never exposed to clients.
    pub root_dir: PathBuf,
    /// Socket address the server binds to.
    pub bind: String,
    /// Path prefix under which every route is mounted (e.g. "/" or "/hub").
    pub base_url: String,
    /// When set, every control-plane and proxy request must present this token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Seconds between directory rescans when a create request omits `reload_interval`.
    pub default_reload_interval: f64,
    /// Regex matched against file names to decide what the built-in dashboard indexes.
    pub file_pattern: String,
    /// Largest accepted control-plane request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            root_dir: PathBuf::from("."),
            bind: "127.0.0.1:8888".into(),
            base_url: "/".into(),
            token: None,
            default_reload_interval: 30.0,
            file_pattern: DEFAULT_FILE_PATTERN.into(),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Settings {
    /// Base URL without trailing slash; empty for the root mount.
    pub fn base_prefix(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
