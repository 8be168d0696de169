//! logdir-hub server: loads settings from the environment, builds the instance manager and
//! serves the control plane and proxy until Ctrl-C.
//!
//! Run from repo root: `cargo run -p logdir-hub-server`

use logdir_hub::{
    hub_router, load_settings, unavailable_router, validate, AppFactory, AppState,
    DirectoryIndexFactory, InstanceManager, ReloadInterval,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("logdir_hub=info,tower_http=info")
            }),
        )
        .init();

    let settings = load_settings()?;
    validate(&settings)?;

    let mut manager: Option<Arc<InstanceManager>> = None;
    let app = match DirectoryIndexFactory::new(&settings.file_pattern) {
        Ok(factory) => {
            let factory: Arc<dyn AppFactory> = Arc::new(factory);
            let m = Arc::new(InstanceManager::with_default_interval(
                settings.root_dir.clone(),
                factory,
                ReloadInterval::from_secs_f64(settings.default_reload_interval),
            ));
            manager = Some(m.clone());
            hub_router(AppState::new(m, settings.clone()))
        }
        Err(e) => {
            tracing::error!(error = %e, "embedded dashboard unavailable, serving error responses");
            unavailable_router(&settings, e.to_string())
        }
    };
    let app = app.layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&settings.bind).await?;
    tracing::info!(
        "logdir-hub listening on http://{}{} (root {})",
        listener.local_addr()?,
        settings.base_url,
        settings.root_dir.display()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(m) = manager {
        m.shutdown().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
