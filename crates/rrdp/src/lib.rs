//! RRDP fetching for the rsyncit mirror.
//!
//! - Notification and snapshot parsing with structural validation
//! - The process-wide timestamp cache and sync status
//! - Per-object timestamp extraction with a hash-derived sub-second offset
//! - [`RrdpFetcher`], which ties these together into one fetch attempt

pub mod error;
pub mod fetcher;
pub mod http;
pub mod log_filter;
pub mod metrics;
pub mod state;
pub mod timestamp;
pub mod xml;

pub use error::{HttpError, Result, RrdpError, TimestampError};
pub use fetcher::{FetchResult, RrdpFetcher, SnapshotProcessor};
pub use http::{Downloaded, Downloader, HttpDownloader};
pub use log_filter::LogFilter;
pub use metrics::{FetcherMetrics, NoopMetrics};
pub use state::{RrdpState, State, Times};
pub use timestamp::ObjectType;
