//! logdir-hub: hosts one embedded dashboard per log directory,
//! behind a REST control plane and a request proxy.

pub mod builtin;
pub mod config;
pub mod embedded;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod manager;
pub mod refresh;
pub mod response;
pub mod routes;
pub mod state;

pub use builtin::DirectoryIndexFactory;
pub use config::{load_settings, validate, Settings};
pub use embedded::{AppFactory, EmbeddedApp, ReloadStats};
pub use error::{AppError, ConfigError, ReloadError};
pub use manager::{Instance, InstanceManager, ReloadInterval};
pub use refresh::RefreshTask;
pub use response::{display_dir, InstanceBody};
pub use routes::{hub_router, unavailable_router};
pub use state::AppState;
