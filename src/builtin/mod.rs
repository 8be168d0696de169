//! Built-in embedded dashboard: indexes data files under a log directory and serves the
//! index over HTTP. Used when no other [`AppFactory`] is plugged in.

mod app;
mod index;

pub use app::DirectoryIndexApp;
pub use index::{scan, DataFile, RunIndex, ROOT_RUN};

use crate::embedded::{AppFactory, EmbeddedApp};
use crate::error::ConfigError;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

pub struct DirectoryIndexFactory {
    pattern: Regex,
}

impl DirectoryIndexFactory {
    /// Fails when `file_pattern` is not a valid regex.
    pub fn new(file_pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(file_pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: file_pattern.to_string(),
            source,
        })?;
        Ok(DirectoryIndexFactory { pattern })
    }
}

impl AppFactory for DirectoryIndexFactory {
    fn create(&self, directory: &Path) -> Arc<dyn EmbeddedApp> {
        Arc::new(DirectoryIndexApp::new(directory.to_path_buf(), self.pattern.clone()))
    }
}
