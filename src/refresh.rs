//! Background refresh loop: one tokio task per instance that periodically reloads its directory.

use crate::embedded::{EmbeddedApp, ReloadStats};
use crate::error::ReloadError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running refresh loop. Dropping the handle stops the loop.
pub struct RefreshTask {
    cancel: CancellationToken,
    last_refresh: Arc<RwLock<Option<DateTime<Utc>>>>,
    interval: Duration,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Spawn the loop. The first reload starts immediately; the caller does not wait for it.
    pub fn start(app: Arc<dyn EmbeddedApp>, directory: PathBuf, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let last_refresh = Arc::new(RwLock::new(None));
        let handle = tokio::spawn(reload_forever(
            app,
            directory,
            interval,
            cancel.clone(),
            last_refresh.clone(),
        ));
        RefreshTask {
            cancel,
            last_refresh,
            interval,
            handle,
        }
    }

    /// Ask the loop to exit. Does not wait for an in-flight reload to finish.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the spawned task has actually exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Completion time of the most recent successful reload.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh.read().ok().and_then(|guard| *guard)
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn reload_forever(
    app: Arc<dyn EmbeddedApp>,
    directory: PathBuf,
    interval: Duration,
    cancel: CancellationToken,
    last_refresh: Arc<RwLock<Option<DateTime<Utc>>>>,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match reload_once(app.clone()).await {
            Ok(stats) => {
                if let Ok(mut guard) = last_refresh.write() {
                    *guard = Some(Utc::now());
                }
                tracing::debug!(
                    directory = %directory.display(),
                    runs = stats.runs,
                    files = stats.files,
                    "reloaded"
                );
            }
            Err(e) => {
                tracing::warn!(
                    directory = %directory.display(),
                    error = %e,
                    "reload failed, will retry"
                );
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!(directory = %directory.display(), "refresh loop stopped");
}

/// One reload cycle on its own task, so a panicking app surfaces as an error.
async fn reload_once(app: Arc<dyn EmbeddedApp>) -> Result<ReloadStats, ReloadError> {
    tokio::spawn(async move { app.reload().await })
        .await
        .unwrap_or_else(|join| Err(ReloadError::Aborted(join.to_string())))
}
