//! Server test utilities.

use crate::common::fixtures::NOTIFICATION_URL;
use crate::common::mocks::StubDownloader;
use rsyncit_core::AppConfig;
use rsyncit_rrdp::{NoopMetrics, State};
use rsyncit_server::{AppState, SyncService, create_router};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub downloader: Arc<StubDownloader>,
    pub rsync_path: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server writing below a temporary directory.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let rsync_path = temp_dir.path().join("rsync");

        let mut config = AppConfig::for_testing(NOTIFICATION_URL, &rsync_path);
        customize(&mut config);

        let downloader = Arc::new(StubDownloader::new());
        let sync = Arc::new(
            SyncService::new(
                config.clone(),
                downloader.clone(),
                Arc::new(State::new()),
                Arc::new(NoopMetrics),
            )
            .expect("Failed to create sync service"),
        );

        let state = AppState::new(config, sync);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            downloader,
            rsync_path,
            _temp_dir: temp_dir,
        }
    }

    pub fn sync(&self) -> &Arc<SyncService> {
        &self.state.sync
    }

    pub fn published(&self) -> PathBuf {
        self.rsync_path.join("published")
    }
}
