//! Application state shared across handlers.

use crate::sync::SyncService;
use rsyncit_core::AppConfig;
use rsyncit_rrdp::State;
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sync_state: Arc<State>,
    pub sync: Arc<SyncService>,
}

impl AppState {
    pub fn new(config: AppConfig, sync: Arc<SyncService>) -> Self {
        Self {
            config: Arc::new(config),
            sync_state: sync.state().clone(),
            sync,
        }
    }
}
