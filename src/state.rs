//! Shared application state for all routes. The manager is the single owner of instance state.

use crate::config::Settings;
use crate::manager::InstanceManager;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<InstanceManager>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(manager: Arc<InstanceManager>, settings: Settings) -> Self {
        AppState {
            manager,
            settings: Arc::new(settings),
        }
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}
