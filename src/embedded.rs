//! Contract between the hub and the dashboard application it embeds.
//!
//! The hub never looks inside an embedded application: it creates one per log
//! directory through an [`AppFactory`], asks it to re-scan its directory with
//! [`EmbeddedApp::reload`], and forwards proxied HTTP requests to
//! [`EmbeddedApp::handle`] as if the application were mounted at `/`.

use crate::error::ReloadError;
use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Summary of one completed reload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReloadStats {
    pub runs: usize,
    pub files: usize,
}

/// One embedded dashboard bound to a single directory.
///
/// Implementations must tolerate `handle` running concurrently with `reload`:
/// a request observes either the index from before the reload or the one after
/// it, never a partially rebuilt one.
#[async_trait]
pub trait EmbeddedApp: Send + Sync {
    /// Re-scan the backing directory and replace the in-memory index.
    async fn reload(&self) -> Result<ReloadStats, ReloadError>;

    /// Serve a request whose URI has already been rewritten relative to the app root.
    async fn handle(&self, request: Request) -> Response;
}

/// Builds embedded applications. Construction must be cheap and must not touch
/// the directory; the first data load happens through `reload`.
pub trait AppFactory: Send + Sync {
    fn create(&self, directory: &Path) -> Arc<dyn EmbeddedApp>;
}
