//! One fetch-and-publish cycle, guarded against overlapping runs.

use crate::metrics::{
    self, FetchStatus, OBJECTS_PUBLISHED, PUBLISH_DURATION, REJECTED_TOO_SMALL, RRDP_SERIAL,
    SYNC_SKIPPED, TIMESTAMP_CACHE_ENTRIES,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use rsyncit_core::AppConfig;
use rsyncit_publish::RsyncWriter;
use rsyncit_rrdp::{
    Downloader, FetchResult, FetcherMetrics, LogFilter, RrdpFetcher, RrdpState, State,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{error, info};

/// What a call to [`SyncService::sync`] did.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Another cycle was still running.
    Skipped,
    NoUpdates { serial: u64 },
    Published {
        serial: u64,
        objects: usize,
        directory: PathBuf,
    },
    /// The snapshot held fewer objects than the configured minimum.
    Rejected { objects: usize, minimum: usize },
    Failed { message: String },
    Timeout,
}

/// Runs sync cycles against shared state.
pub struct SyncService {
    config: AppConfig,
    downloader: Arc<dyn Downloader>,
    state: Arc<State>,
    metrics: Arc<dyn FetcherMetrics>,
    log_filter: Arc<LogFilter>,
    pool: Arc<ThreadPool>,
    running: AtomicBool,
}

/// Clears the running flag when the cycle ends, including on panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncService {
    pub fn new(
        config: AppConfig,
        downloader: Arc<dyn Downloader>,
        state: Arc<State>,
        metrics: Arc<dyn FetcherMetrics>,
    ) -> anyhow::Result<Self> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(4);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rsync-writer-{i}"))
            .build()?;
        Ok(Self {
            config,
            downloader,
            state,
            metrics,
            log_filter: Arc::new(LogFilter::default()),
            pool: Arc::new(pool),
            running: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one cycle unless one is already in progress.
    pub async fn sync(&self) -> SyncOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Skipping sync: previous cycle is still running");
            SYNC_SKIPPED.inc();
            return SyncOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> SyncOutcome {
        let config = match self.config.cycle_config() {
            Ok(config) => config,
            Err(e) => {
                metrics::record_fetch(FetchStatus::Failed);
                return self.fail(format!("invalid configuration: {e}"));
            }
        };
        let minimum = config.minimal_object_count;
        let fetcher = RrdpFetcher::new(
            config.clone(),
            self.downloader.clone(),
            self.state.clone(),
            self.metrics.clone(),
            self.log_filter.clone(),
        );

        match fetcher.fetch_objects().await {
            FetchResult::NoUpdates { session_id, serial } => {
                metrics::record_fetch(FetchStatus::Success);
                RRDP_SERIAL.set(serial as i64);
                info!(session_id = %session_id, serial, "No updates");
                SyncOutcome::NoUpdates { serial }
            }
            FetchResult::SuccessfulFetch {
                objects,
                session_id,
                serial,
            } => {
                if let Some(minimum) = minimum
                    && objects.len() < minimum
                {
                    REJECTED_TOO_SMALL.inc();
                    error!(
                        objects = objects.len(),
                        minimum, "Refusing to publish: snapshot has fewer objects than required"
                    );
                    return SyncOutcome::Rejected {
                        objects: objects.len(),
                        minimum,
                    };
                }
                metrics::record_fetch(FetchStatus::Success);
                RRDP_SERIAL.set(serial as i64);
                self.state
                    .set_rrdp_state(RrdpState::synced(session_id, serial));

                let count = objects.len();
                let writer = RsyncWriter::with_pool(config, self.pool.clone());
                let started = Instant::now();
                let now = OffsetDateTime::now_utc();
                let written =
                    tokio::task::spawn_blocking(move || writer.write_objects(&objects, now)).await;
                PUBLISH_DURATION.observe(started.elapsed().as_secs_f64());

                let directory = match written {
                    Ok(Ok(directory)) => directory,
                    Ok(Err(e)) => return self.fail(format!("failed to publish objects: {e}")),
                    Err(e) => return self.fail(format!("publisher task failed: {e}")),
                };
                OBJECTS_PUBLISHED.set(count as i64);
                self.state.mark_in_sync();

                let ttl = self.config.sync.timestamp_cache_ttl();
                let removed = self.state.remove_stale(OffsetDateTime::now_utc() - ttl);
                TIMESTAMP_CACHE_ENTRIES.set(self.state.cached_entries() as i64);
                info!(
                    serial,
                    objects = count,
                    evicted = removed,
                    directory = %directory.display(),
                    "Sync cycle complete"
                );
                SyncOutcome::Published {
                    serial,
                    objects: count,
                    directory,
                }
            }
            FetchResult::FailedFetch { error } => {
                metrics::record_fetch(FetchStatus::Failed);
                error!(error = %error, "Failed to fetch RRDP repository");
                self.state.set_rrdp_state(RrdpState::failed(error.to_string()));
                SyncOutcome::Failed {
                    message: error.to_string(),
                }
            }
            FetchResult::Timeout => {
                metrics::record_fetch(FetchStatus::Timeout);
                SyncOutcome::Timeout
            }
        }
    }

    fn fail(&self, message: String) -> SyncOutcome {
        error!(error = %message, "Sync cycle failed");
        self.state.set_rrdp_state(RrdpState::failed(message.clone()));
        SyncOutcome::Failed { message }
    }
}
