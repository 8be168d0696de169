//! Proxy routes under /embedded. GET also answers HEAD.

use crate::handlers::embedded::proxy;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn embedded_routes(state: AppState) -> Router {
    Router::new()
        .route("/embedded/*rest", get(proxy).post(proxy))
        .with_state(state)
}
