//! Proxy from `/embedded/:id/...` to the instance's embedded dashboard.
//!
//! The prefix is stripped so the dashboard sees requests as if it were mounted at `/`.
//! Query string, headers and body pass through untouched.

use crate::error::AppError;
use crate::extractors::Authenticated;
use crate::state::AppState;
use axum::extract::{OriginalUri, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

/// Path prefix the proxy routes are mounted under, relative to the base URL.
pub const EMBEDDED_PREFIX: &str = "/embedded/";

/// GET|POST /embedded/*rest
pub async fn proxy(
    _auth: Authenticated,
    State(state): State<AppState>,
    OriginalUri(original): OriginalUri,
    mut request: Request,
) -> Result<Response, AppError> {
    let (id, sub_path) = split_instance_path(request.uri().path())
        .ok_or_else(|| AppError::InstanceNotFound(String::new()))?;
    let (id, sub_path) = (id.to_string(), sub_path.to_string());

    if request.method() == Method::POST {
        if sub_path.is_empty() {
            return Err(AppError::Forbidden("POST to an instance root".into()));
        }
        check_same_origin(request.headers(), request.uri())?;
    }

    let instance = state.manager.get(&id).await?;

    if sub_path.is_empty() {
        return Ok(trailing_slash_redirect(&original));
    }

    let rewritten = match request.uri().query() {
        Some(q) => format!("{}?{}", sub_path, q),
        None => sub_path,
    };
    *request.uri_mut() = rewritten
        .parse::<Uri>()
        .map_err(|e| AppError::BadRequest(format!("invalid path: {}", e)))?;
    tracing::trace!(id = %instance.id(), uri = %request.uri(), "proxying");

    Ok(instance.app().handle(request).await)
}

/// Split `/embedded/<id><sub_path>` into id and sub-path. The sub-path keeps its leading
/// slash and is empty for `/embedded/<id>`.
pub fn split_instance_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix(EMBEDDED_PREFIX)?;
    let (id, sub_path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    (!id.is_empty()).then_some((id, sub_path))
}

/// 301 to the same URL with a trailing slash so the dashboard's relative links resolve.
fn trailing_slash_redirect(original: &Uri) -> Response {
    let location = match original.query() {
        Some(q) => format!("{}/?{}", original.path(), q),
        None => format!("{}/", original.path()),
    };
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

/// The dashboard's own POSTs cannot carry host tokens, so they are only accepted when the
/// `Referer` names the same host the request was sent to.
fn check_same_origin(headers: &HeaderMap, uri: &Uri) -> Result<(), AppError> {
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Forbidden("missing Referer".into()))?;
    let referer_host = referer
        .parse::<Uri>()
        .ok()
        .and_then(|u| u.authority().map(|a| a.as_str().to_ascii_lowercase()))
        .ok_or_else(|| AppError::Forbidden("unparseable Referer".into()))?;
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| AppError::Forbidden("missing Host".into()))?;
    if referer_host != host {
        tracing::warn!(referer = %referer, host = %host, "blocking cross-origin POST");
        return Err(AppError::Forbidden("cross-origin POST".into()));
    }
    Ok(())
}
