//! Instance control plane: list, create, get, delete.

use crate::error::AppError;
use crate::extractors::Authenticated;
use crate::manager::ReloadInterval;
use crate::response::InstanceBody;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateInstance {
    pub logdir: String,
    #[serde(default)]
    pub reload_interval: Option<f64>,
}

/// GET /api/tb/ — every live instance.
pub async fn list_instances(
    _auth: Authenticated,
    State(state): State<AppState>,
) -> Json<Vec<InstanceBody>> {
    let root = state.manager.root_dir();
    let bodies = state
        .manager
        .list()
        .await
        .iter()
        .map(|i| InstanceBody::from_instance(i, root))
        .collect();
    Json(bodies)
}

/// POST /api/tb/ — create an instance for `logdir`, or return the one already serving it.
pub async fn create_instance(
    _auth: Authenticated,
    State(state): State<AppState>,
    body: Result<Json<CreateInstance>, JsonRejection>,
) -> Result<Json<InstanceBody>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if req.logdir.trim().is_empty() {
        return Err(AppError::BadRequest("logdir must not be empty".into()));
    }
    let instance = state
        .manager
        .get_or_create(&req.logdir, req.reload_interval.map(ReloadInterval::from_secs_f64))
        .await?;
    Ok(Json(InstanceBody::from_instance(&instance, state.manager.root_dir())))
}

/// GET /api/tb/:name
pub async fn get_instance(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InstanceBody>, AppError> {
    let instance = state.manager.get(&name).await?;
    Ok(Json(InstanceBody::from_instance(&instance, state.manager.root_dir())))
}

/// DELETE /api/tb/:name
pub async fn delete_instance(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.manager.terminate(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
