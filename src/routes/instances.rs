//! Control-plane routes under /api/tb.

use crate::handlers::instances::{create_instance, delete_instance, get_instance, list_instances};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn instance_routes(state: AppState) -> Router {
    let limit = state.settings.max_body_bytes;
    Router::new()
        .route("/api/tb", get(list_instances).post(create_instance))
        .route("/api/tb/", get(list_instances).post(create_instance))
        .route("/api/tb/:name", get(get_instance).delete(delete_instance))
        .layer(RequestBodyLimitLayer::new(limit))
        .with_state(state)
}
