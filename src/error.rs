//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure of a single reload cycle. Never fatal: the refresh loop logs it and keeps going.
#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("log directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reload task aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Dashboard instance not found: '{0}'")]
    InstanceNotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("embedded dashboard unavailable: {0}")]
    Unavailable(String),
}

/// Error envelope returned by every API endpoint.
#[derive(Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub reason: &'static str,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InstanceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            AppError::InstanceNotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Unauthorized => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unavailable(_) => "unavailable",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        let body = ErrorBody {
            reason: self.reason(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
