//! Periodic trigger for sync cycles.

use crate::sync::SyncService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Trigger a cycle every `period`, starting immediately.
///
/// Each cycle runs on its own task, so a slow cycle does not delay the
/// ticker and the next trigger is turned away by the service's overlap guard.
pub fn spawn_scheduler(service: Arc<SyncService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = period.as_secs(), "Sync scheduler started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let service = service.clone();
            tokio::spawn(async move {
                let outcome = service.sync().await;
                tracing::debug!(?outcome, "Sync trigger finished");
            });
        }
    })
}
