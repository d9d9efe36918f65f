//! Hooks the fetcher calls at notable events.

use std::time::Duration;

/// Receiver for fetcher measurements. All methods default to doing nothing.
pub trait FetcherMetrics: Send + Sync {
    /// An object could not be decoded or its timestamp could not be parsed.
    fn bad_object(&self) {}

    /// `count` objects were dropped because their URL was already taken.
    fn url_collisions(&self, _count: usize) {}

    fn snapshot_download_time(&self, _elapsed: Duration) {}

    fn object_construction_time(&self, _elapsed: Duration) {}
}

/// Discards all measurements.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl FetcherMetrics for NoopMetrics {}
