//! Directory scan producing the run index served by the built-in dashboard.

use crate::error::ReloadError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Run name used for data files sitting directly in the log directory.
pub const ROOT_RUN: &str = ".";

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DataFile {
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Snapshot of a log directory: run name (directory relative to the logdir) to its data files.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunIndex {
    pub runs: BTreeMap<String, Vec<DataFile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
}

impl RunIndex {
    pub fn file_count(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }

    pub fn run_names(&self) -> Vec<String> {
        self.runs.keys().cloned().collect()
    }
}

/// Walk `logdir` recursively and collect every file whose name matches `pattern`.
/// Subdirectories that vanish or cannot be read mid-scan are skipped;
/// the logdir itself must be readable.
pub fn scan(logdir: &Path, pattern: &Regex) -> Result<RunIndex, ReloadError> {
    if !logdir.is_dir() {
        return Err(ReloadError::MissingDirectory(logdir.to_path_buf()));
    }
    let mut runs: BTreeMap<String, Vec<DataFile>> = BTreeMap::new();
    let mut pending: Vec<PathBuf> = vec![logdir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir == logdir => {
                return Err(ReloadError::Io { path: dir, source });
            }
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else { continue };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !pattern.is_match(&name) {
                continue;
            }
            let metadata = entry.metadata().ok();
            runs.entry(run_name(logdir, &dir)).or_default().push(DataFile {
                name,
                size: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
                modified: metadata
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from),
            });
        }
    }

    for files in runs.values_mut() {
        files.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(RunIndex {
        runs,
        scanned_at: Some(Utc::now()),
    })
}

fn run_name(logdir: &Path, dir: &Path) -> String {
    match dir.strip_prefix(logdir) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        _ => ROOT_RUN.to_string(),
    }
}
