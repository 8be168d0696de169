//! The built-in dashboard: an axum router over a swappable run index.

use crate::builtin::index::{scan, DataFile, RunIndex};
use crate::embedded::{EmbeddedApp, ReloadStats};
use crate::error::ReloadError;
use async_trait::async_trait;
use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tower::ServiceExt;

struct Shared {
    directory: PathBuf,
    pattern: Regex,
    index: RwLock<Arc<RunIndex>>,
}

impl Shared {
    fn snapshot(&self) -> Arc<RunIndex> {
        self.index
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub struct DirectoryIndexApp {
    shared: Arc<Shared>,
    router: Router,
}

impl DirectoryIndexApp {
    pub fn new(directory: PathBuf, pattern: Regex) -> Self {
        let shared = Arc::new(Shared {
            directory,
            pattern,
            index: RwLock::new(Arc::new(RunIndex::default())),
        });
        let router = Router::new()
            .route("/", get(overview))
            .route("/data/runs", get(runs))
            .route("/data/environment", get(environment))
            .route("/data/files", get(files))
            .route("/data/files_multirun", post(files_multirun))
            .fallback(not_found)
            .with_state(shared.clone());
        DirectoryIndexApp { shared, router }
    }

    /// Current index; readers keep their snapshot even if a reload swaps it out.
    pub fn snapshot(&self) -> Arc<RunIndex> {
        self.shared.snapshot()
    }
}

#[async_trait]
impl EmbeddedApp for DirectoryIndexApp {
    async fn reload(&self) -> Result<ReloadStats, ReloadError> {
        let shared = self.shared.clone();
        let index = tokio::task::spawn_blocking(move || scan(&shared.directory, &shared.pattern))
            .await
            .map_err(|e| ReloadError::Aborted(e.to_string()))??;
        let stats = ReloadStats {
            runs: index.runs.len(),
            files: index.file_count(),
        };
        if let Ok(mut guard) = self.shared.index.write() {
            *guard = Arc::new(index);
        }
        Ok(stats)
    }

    async fn handle(&self, request: Request) -> Response {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

async fn overview(State(shared): State<Arc<Shared>>) -> Html<String> {
    let index = shared.snapshot();
    let mut rows = String::new();
    for (run, files) in &index.runs {
        rows.push_str(&format!(
            "<li><a href=\"data/files?run={}\">{}</a> ({} files)</li>\n",
            escape(run),
            escape(run),
            files.len()
        ));
    }
    if rows.is_empty() {
        rows.push_str("<li>No data found yet.</li>\n");
    }
    Html(format!(
        "<!doctype html>\n<html><head><title>Runs</title></head><body>\n\
         <h1>Runs</h1>\n<ul>\n{}</ul>\n\
         <p><a href=\"data/runs\">runs</a> | <a href=\"data/environment\">environment</a></p>\n\
         </body></html>\n",
        rows
    ))
}

async fn runs(State(shared): State<Arc<Shared>>) -> Json<Vec<String>> {
    Json(shared.snapshot().run_names())
}

async fn environment(State(shared): State<Arc<Shared>>) -> Json<serde_json::Value> {
    let index = shared.snapshot();
    Json(serde_json::json!({
        "data_location": shared.directory.to_string_lossy(),
        "runs": index.runs.len(),
        "files": index.file_count(),
        "reloaded_at": index.scanned_at,
    }))
}

#[derive(Deserialize)]
struct FilesQuery {
    run: String,
}

async fn files(
    State(shared): State<Arc<Shared>>,
    Query(q): Query<FilesQuery>,
) -> Result<Json<Vec<DataFile>>, (StatusCode, Json<serde_json::Value>)> {
    shared
        .snapshot()
        .runs
        .get(&q.run)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "message": format!("run not found: '{}'", q.run) })),
            )
        })
}

#[derive(Deserialize)]
struct MultiRun {
    runs: Vec<String>,
}

/// Files for several runs at once; unknown runs are omitted.
async fn files_multirun(
    State(shared): State<Arc<Shared>>,
    Json(req): Json<MultiRun>,
) -> Json<BTreeMap<String, Vec<DataFile>>> {
    let index = shared.snapshot();
    let out = req
        .runs
        .into_iter()
        .filter_map(|run| index.runs.get(&run).cloned().map(|files| (run, files)))
        .collect();
    Json(out)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "no such dashboard endpoint" })),
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
