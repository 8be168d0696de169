//! Instance manager: owns every live dashboard instance, keyed both by id and by log directory.

use crate::embedded::{AppFactory, EmbeddedApp};
use crate::error::AppError;
use crate::refresh::RefreshTask;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

/// One running embedded dashboard. Directory and app handle never change after creation.
pub struct Instance {
    id: String,
    directory: PathBuf,
    app: Arc<dyn EmbeddedApp>,
    refresh: Option<RefreshTask>,
    created_at: DateTime<Utc>,
}

impl Instance {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn app(&self) -> &Arc<dyn EmbeddedApp> {
        &self.app
    }

    pub fn refresh_task(&self) -> Option<&RefreshTask> {
        self.refresh.as_ref()
    }

    /// `None` when refresh is disabled or no reload has completed yet.
    pub fn last_refresh_time(&self) -> Option<DateTime<Utc>> {
        self.refresh.as_ref().and_then(RefreshTask::last_refresh)
    }

    pub fn reload_interval(&self) -> Option<Duration> {
        self.refresh.as_ref().map(RefreshTask::interval)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("directory", &self.directory)
            .field("reload_interval", &self.reload_interval())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Slot for an instance whose app is still being built and loaded.
type Pending = Arc<OnceCell<Arc<Instance>>>;

#[derive(Default)]
struct Indices {
    by_id: BTreeMap<u64, Arc<Instance>>,
    by_directory: HashMap<PathBuf, u64>,
    pending: HashMap<PathBuf, Pending>,
}

impl Indices {
    fn live(&self, directory: &Path) -> Option<&Arc<Instance>> {
        self.by_directory
            .get(directory)
            .and_then(|id| self.by_id.get(id))
    }

    /// Smallest positive integer not held by a live instance.
    fn next_available_id(&self) -> u64 {
        (1..)
            .find(|n| !self.by_id.contains_key(n))
            .unwrap_or(u64::MAX)
    }

    fn remove(&mut self, id: u64) -> Option<Arc<Instance>> {
        let instance = self.by_id.remove(&id)?;
        self.by_directory.remove(&instance.directory);
        Some(instance)
    }
}

/// Reload interval requested at creation. Non-positive values disable background refresh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReloadInterval(f64);

impl ReloadInterval {
    pub fn from_secs_f64(secs: f64) -> Self {
        ReloadInterval(secs)
    }

    pub fn disabled() -> Self {
        ReloadInterval(0.0)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }

    /// `None` when refresh is disabled.
    pub fn as_duration(&self) -> Option<Duration> {
        if self.0.is_finite() && self.0 > 0.0 {
            Duration::try_from_secs_f64(self.0).ok()
        } else {
            None
        }
    }
}

impl From<Duration> for ReloadInterval {
    fn from(d: Duration) -> Self {
        ReloadInterval(d.as_secs_f64())
    }
}

pub struct InstanceManager {
    root_dir: PathBuf,
    factory: Arc<dyn AppFactory>,
    default_interval: ReloadInterval,
    indices: Mutex<Indices>,
}

impl InstanceManager {
    pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(30);

    pub fn new(root_dir: impl Into<PathBuf>, factory: Arc<dyn AppFactory>) -> Self {
        Self::with_default_interval(root_dir, factory, Self::DEFAULT_RELOAD_INTERVAL.into())
    }

    pub fn with_default_interval(
        root_dir: impl Into<PathBuf>,
        factory: Arc<dyn AppFactory>,
        default_interval: ReloadInterval,
    ) -> Self {
        InstanceManager {
            root_dir: normalize(&root_dir.into()),
            factory,
            default_interval,
            indices: Mutex::new(Indices::default()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn default_reload_interval(&self) -> ReloadInterval {
        self.default_interval
    }

    /// Absolute, lexically normalized form of `directory`; relative paths are joined onto the root.
    pub fn resolve(&self, directory: impl AsRef<Path>) -> PathBuf {
        let directory = directory.as_ref();
        if directory.is_absolute() {
            normalize(directory)
        } else {
            normalize(&self.root_dir.join(directory))
        }
    }

    /// Return the instance serving `directory`, creating it if none exists.
    ///
    /// An existing instance is returned as is; `reload_interval` only applies to new instances.
    /// The index lock is released while a new app loads, so lookups of other instances proceed;
    /// concurrent callers for the same directory wait on one shared slot.
    pub async fn get_or_create(
        &self,
        directory: impl AsRef<Path>,
        reload_interval: Option<ReloadInterval>,
    ) -> Result<Arc<Instance>, AppError> {
        let directory = self.resolve(directory);
        let slot = {
            let mut indices = self.indices.lock().await;
            if let Some(existing) = indices.live(&directory) {
                if reload_interval.is_some() {
                    tracing::debug!(
                        id = %existing.id,
                        directory = %directory.display(),
                        "instance already exists, requested reload interval ignored"
                    );
                }
                return Ok(existing.clone());
            }
            indices.pending.entry(directory.clone()).or_default().clone()
        };

        let instance = slot
            .get_or_init(|| self.create(directory.clone(), reload_interval))
            .await;
        Ok(instance.clone())
    }

    async fn create(
        &self,
        directory: PathBuf,
        reload_interval: Option<ReloadInterval>,
    ) -> Arc<Instance> {
        let interval = reload_interval.unwrap_or(self.default_interval);
        let app = self.factory.create(&directory);
        let refresh = match interval.as_duration() {
            Some(period) => Some(RefreshTask::start(app.clone(), directory.clone(), period)),
            None => {
                if let Err(e) = app.reload().await {
                    tracing::warn!(
                        directory = %directory.display(),
                        error = %e,
                        "initial load failed"
                    );
                }
                None
            }
        };

        let mut indices = self.indices.lock().await;
        indices.pending.remove(&directory);
        let n = indices.next_available_id();
        let instance = Arc::new(Instance {
            id: n.to_string(),
            directory: directory.clone(),
            app,
            refresh,
            created_at: Utc::now(),
        });
        indices.by_id.insert(n, instance.clone());
        indices.by_directory.insert(directory, n);
        tracing::info!(
            id = %instance.id,
            directory = %instance.directory.display(),
            reload_interval_secs = interval.as_secs_f64(),
            "instance created"
        );
        instance
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Instance>, AppError> {
        let indices = self.indices.lock().await;
        parse_id(id)
            .and_then(|n| indices.by_id.get(&n))
            .cloned()
            .ok_or_else(|| AppError::InstanceNotFound(id.to_string()))
    }

    /// All live instances in ascending id order.
    pub async fn list(&self) -> Vec<Arc<Instance>> {
        self.indices.lock().await.by_id.values().cloned().collect()
    }

    /// Stop the instance's refresh loop and forget the instance.
    /// Does not wait for the loop to exit.
    pub async fn terminate(&self, id: &str) -> Result<(), AppError> {
        let mut indices = self.indices.lock().await;
        let n = parse_id(id)
            .filter(|n| indices.by_id.contains_key(n))
            .ok_or_else(|| AppError::InstanceNotFound(id.to_string()))?;
        if let Some(instance) = indices.remove(n) {
            if let Some(task) = &instance.refresh {
                task.stop();
            }
            tracing::info!(
                id = %instance.id,
                directory = %instance.directory.display(),
                "instance terminated"
            );
        }
        Ok(())
    }

    /// Terminate every live instance.
    pub async fn shutdown(&self) {
        let mut indices = self.indices.lock().await;
        let ids: Vec<u64> = indices.by_id.keys().copied().collect();
        for n in ids {
            if let Some(instance) = indices.remove(n) {
                if let Some(task) = &instance.refresh {
                    task.stop();
                }
            }
        }
        tracing::info!("all instances terminated");
    }
}

/// Ids are canonical decimal strings; "01" or "+1" do not name instance 1.
fn parse_id(id: &str) -> Option<u64> {
    let n: u64 = id.parse().ok()?;
    (n.to_string() == id).then_some(n)
}

/// Drop `.` components and fold `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
