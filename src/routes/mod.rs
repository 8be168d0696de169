//! Route assembly. Everything is mounted under the configured base URL.

pub mod common;
pub mod embedded;
pub mod instances;

pub use common::{common_routes, common_routes_degraded, common_routes_with_ready};
pub use embedded::embedded_routes;
pub use instances::instance_routes;

use crate::config::Settings;
use crate::error::AppError;
use crate::handlers::embedded::EMBEDDED_PREFIX;
use crate::state::AppState;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;

/// Full router: health, control plane and proxy.
pub fn hub_router(state: AppState) -> Router {
    let prefix = state.settings.base_prefix().to_string();
    let routes = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(instance_routes(state.clone()))
        .merge(embedded_routes(state));
    mount(&prefix, routes)
}

#[derive(Clone)]
struct Unavailable {
    prefix: String,
    reason: Arc<str>,
}

/// Router used when the embedded dashboard cannot be constructed: health routes still work,
/// every control-plane and proxy path answers 503 with `reason`.
pub fn unavailable_router(settings: &Settings, reason: impl Into<String>) -> Router {
    let prefix = settings.base_prefix().to_string();
    let state = Unavailable {
        prefix: prefix.clone(),
        reason: Arc::from(reason.into()),
    };
    let routes = Router::new()
        .merge(common_routes_degraded())
        .merge(Router::new().fallback(unavailable).with_state(state));
    mount(&prefix, routes)
}

async fn unavailable(State(state): State<Unavailable>, uri: Uri) -> Response {
    let path = uri.path();
    let path = path.strip_prefix(state.prefix.as_str()).unwrap_or(path);
    let embedded_root = EMBEDDED_PREFIX.trim_end_matches('/');
    let is_hub_path = path == "/api/tb"
        || path.starts_with("/api/tb/")
        || path == embedded_root
        || path.starts_with(EMBEDDED_PREFIX);
    if is_hub_path {
        AppError::Unavailable(state.reason.to_string()).into_response()
    } else {
        axum::http::StatusCode::NOT_FOUND.into_response()
    }
}

fn mount(prefix: &str, routes: Router) -> Router {
    if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    }
}
