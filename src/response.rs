//! JSON bodies returned by the control plane.

use crate::manager::Instance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Stands in for the configured root so absolute server paths never reach clients.
pub const ROOT_DIR_SENTINEL: &str = "<root_dir>";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InstanceBody {
    pub name: String,
    pub logdir: String,
    pub reload_time: Option<DateTime<Utc>>,
    /// Seconds between reloads; null when background refresh is disabled.
    pub reload_interval: Option<f64>,
}

impl InstanceBody {
    pub fn from_instance(instance: &Instance, root_dir: &Path) -> Self {
        InstanceBody {
            name: instance.id().to_string(),
            logdir: display_dir(instance.directory(), root_dir),
            reload_time: instance.last_refresh_time(),
            reload_interval: instance.reload_interval().map(|d| d.as_secs_f64()),
        }
    }
}

/// `<root_dir>/relative/path`, with `..` segments when `dir` lies outside `root`.
pub fn display_dir(dir: &Path, root: &Path) -> String {
    let rel = relative_to(dir, root);
    let mut out = PathBuf::from(ROOT_DIR_SENTINEL);
    if rel.as_os_str().is_empty() {
        return out.to_string_lossy().into_owned();
    }
    out.push(rel);
    out.to_string_lossy().into_owned()
}

fn relative_to(dir: &Path, root: &Path) -> PathBuf {
    let dir: Vec<Component> = dir.components().collect();
    let root: Vec<Component> = root.components().collect();
    let common = dir.iter().zip(root.iter()).take_while(|(a, b)| a == b).count();
    let mut rel = PathBuf::new();
    for _ in common..root.len() {
        rel.push("..");
    }
    for c in &dir[common..] {
        rel.push(c);
    }
    rel
}
