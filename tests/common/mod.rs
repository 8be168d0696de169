//! Shared fixtures: a stub dashboard that echoes what it receives, and request helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use logdir_hub::{AppFactory, EmbeddedApp, ReloadError, ReloadStats};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

pub struct EchoApp {
    pub directory: PathBuf,
    pub reloads: AtomicUsize,
}

#[async_trait]
impl EmbeddedApp for EchoApp {
    async fn reload(&self) -> Result<ReloadStats, ReloadError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(ReloadStats::default())
    }

    async fn handle(&self, request: Request) -> Response {
        let method = request.method().to_string();
        let uri = request.uri().to_string();
        let echo = request
            .headers()
            .get("x-echo")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        Json(serde_json::json!({
            "method": method,
            "uri": uri,
            "x_echo": echo,
            "body": String::from_utf8_lossy(&body),
            "directory": self.directory.to_string_lossy(),
        }))
        .into_response()
    }
}

/// Counts how many embedded apps it has built.
#[derive(Default)]
pub struct EchoFactory {
    pub created: AtomicUsize,
}

impl EchoFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl AppFactory for EchoFactory {
    fn create(&self, directory: &Path) -> Arc<dyn EmbeddedApp> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(EchoApp {
            directory: directory.to_path_buf(),
            reloads: AtomicUsize::new(0),
        })
    }
}

/// Builds echo apps whose every reload takes `delay`.
pub struct SlowFactory {
    pub delay: std::time::Duration,
    pub created: AtomicUsize,
}

impl SlowFactory {
    pub fn new(delay: std::time::Duration) -> Self {
        SlowFactory {
            delay,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

pub struct SlowApp {
    inner: EchoApp,
    delay: std::time::Duration,
}

#[async_trait]
impl EmbeddedApp for SlowApp {
    async fn reload(&self) -> Result<ReloadStats, ReloadError> {
        tokio::time::sleep(self.delay).await;
        self.inner.reload().await
    }

    async fn handle(&self, request: Request) -> Response {
        self.inner.handle(request).await
    }
}

impl AppFactory for SlowFactory {
    fn create(&self, directory: &Path) -> Arc<dyn EmbeddedApp> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Arc::new(SlowApp {
            inner: EchoApp {
                directory: directory.to_path_buf(),
                reloads: AtomicUsize::new(0),
            },
            delay: self.delay,
        })
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn send(app: &Router, request: axum::http::Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse { status, headers, body }
}

pub fn get(uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
