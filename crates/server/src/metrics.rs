//! Prometheus metrics for the sync service.
//!
//! The `/metrics` endpoint is unauthenticated so Prometheus can scrape it.
//! It only exposes aggregate counters about the mirrored repository.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use rsyncit_rrdp::FetcherMetrics;
use std::sync::{LazyLock, Once};
use std::time::Duration;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Fetch cycle metrics
pub static FETCHES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("rsyncit_fetches_total", "Fetch cycles by outcome"),
        &["status"],
    )
    .expect("metric creation failed")
});

pub static RRDP_SERIAL: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new("rsyncit_rrdp_serial", "Serial of the last fetched RRDP snapshot")
        .expect("metric creation failed")
});

pub static SNAPSHOT_DOWNLOAD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "rsyncit_snapshot_download_seconds",
            "Time taken to download the RRDP snapshot",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .expect("metric creation failed")
});

pub static OBJECT_CONSTRUCTION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "rsyncit_object_construction_seconds",
            "Time taken to decode and timestamp all snapshot objects",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

// Object metrics
pub static BAD_OBJECTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "rsyncit_bad_objects_total",
        "Total number of snapshot objects that could not be decoded",
    )
    .expect("metric creation failed")
});

pub static URL_COLLISIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "rsyncit_url_collisions_total",
        "Total number of snapshot objects dropped because their URL was already seen",
    )
    .expect("metric creation failed")
});

// Scheduling metrics
pub static SYNC_SKIPPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "rsyncit_sync_skipped_total",
        "Total number of triggers skipped because the previous cycle was still running",
    )
    .expect("metric creation failed")
});

pub static REJECTED_TOO_SMALL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "rsyncit_rejected_too_small_total",
        "Total number of snapshots rejected for containing too few objects",
    )
    .expect("metric creation failed")
});

// Publication metrics
pub static PUBLISH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "rsyncit_publish_duration_seconds",
            "Time taken to write a publication directory",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .expect("metric creation failed")
});

pub static OBJECTS_PUBLISHED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "rsyncit_objects_published",
        "Number of objects in the current publication directory",
    )
    .expect("metric creation failed")
});

pub static TIMESTAMP_CACHE_ENTRIES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "rsyncit_timestamp_cache_entries",
        "Number of entries in the object timestamp cache",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(FETCHES.clone()),
            Box::new(RRDP_SERIAL.clone()),
            Box::new(SNAPSHOT_DOWNLOAD_DURATION.clone()),
            Box::new(OBJECT_CONSTRUCTION_DURATION.clone()),
            Box::new(BAD_OBJECTS.clone()),
            Box::new(URL_COLLISIONS.clone()),
            Box::new(SYNC_SKIPPED.clone()),
            Box::new(REJECTED_TOO_SMALL.clone()),
            Box::new(PUBLISH_DURATION.clone()),
            Box::new(OBJECTS_PUBLISHED.clone()),
            Box::new(TIMESTAMP_CACHE_ENTRIES.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!(error = %e, "Failed to register metric");
            }
        }
    });
}

/// Handler for the `/metrics` endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Fetch outcome label values for [`FETCHES`].
#[derive(Clone, Copy, Debug)]
pub enum FetchStatus {
    Success,
    Failed,
    Timeout,
}

impl FetchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

pub fn record_fetch(status: FetchStatus) {
    FETCHES.with_label_values(&[status.as_str()]).inc();
}

/// Forwards fetcher hooks to the global Prometheus metrics.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrometheusFetcherMetrics;

impl FetcherMetrics for PrometheusFetcherMetrics {
    fn bad_object(&self) {
        BAD_OBJECTS.inc();
    }

    fn url_collisions(&self, count: usize) {
        URL_COLLISIONS.inc_by(count as u64);
    }

    fn snapshot_download_time(&self, elapsed: Duration) {
        SNAPSHOT_DOWNLOAD_DURATION.observe(elapsed.as_secs_f64());
    }

    fn object_construction_time(&self, elapsed: Duration) {
        OBJECT_CONSTRUCTION_DURATION.observe(elapsed.as_secs_f64());
    }
}
