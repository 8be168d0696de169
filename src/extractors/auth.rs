//! Token authentication for the control plane and the proxy.

use crate::config::Settings;
use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::collections::HashMap;
use std::sync::Arc;

/// Query parameter carrying the token when no `Authorization` header is sent.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Proof that the request carried the configured token (or that none is configured).
#[derive(Clone, Debug)]
pub struct Authenticated;

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    Arc<Settings>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let settings = Arc::<Settings>::from_ref(state);
        let Some(expected) = settings.token.as_deref() else {
            return Ok(Authenticated);
        };
        match presented_token(parts) {
            Some(token) if token == expected => Ok(Authenticated),
            _ => Err(AppError::Unauthorized),
        }
    }
}

fn presented_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            (scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer"))
                .then(|| token.trim().to_string())
        });
    from_header.or_else(|| {
        let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
        params.remove(TOKEN_QUERY_PARAM)
    })
}
