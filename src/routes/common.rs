//! Common routes: health, readiness, version. Never require authentication.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instances: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dashboard: Option<&'static str>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> Json<ReadyBody> {
    Json(ReadyBody {
        status: "ok",
        instances: Some(state.manager.list().await.len()),
        dashboard: Some("ok"),
    })
}

async fn not_ready() -> (StatusCode, Json<ReadyBody>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ReadyBody {
            status: "degraded",
            instances: None,
            dashboard: Some("unavailable"),
        }),
    )
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Common routes (no state): GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Common routes including readiness with the live instance count.
pub fn common_routes_with_ready(state: AppState) -> Router {
    common_routes().merge(Router::new().route("/ready", get(ready)).with_state(state))
}

/// Common routes for a server whose embedded dashboard failed to initialise.
pub fn common_routes_degraded() -> Router {
    common_routes().route("/ready", get(not_ready))
}
