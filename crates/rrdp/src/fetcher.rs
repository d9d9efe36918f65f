//! Notification polling and snapshot processing.

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use bytes::Bytes;
use rayon::prelude::*;
use rsyncit_core::{Config, ContentHash, RpkiObject};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::error::{Result, RrdpError};
use crate::http::Downloader;
use crate::log_filter::LogFilter;
use crate::metrics::FetcherMetrics;
use crate::state::State;
use crate::timestamp::{fallback_timestamp, incorporate_hash_in_timestamp, resolve_timestamp};
use crate::xml::{PublishElement, parse_notification, parse_snapshot};

/// Outcome of one fetch attempt.
#[derive(Debug)]
pub enum FetchResult {
    /// The repository is still at the session and serial we last saw.
    NoUpdates { session_id: String, serial: u64 },
    SuccessfulFetch {
        objects: Vec<RpkiObject>,
        session_id: String,
        serial: u64,
    },
    FailedFetch { error: RrdpError },
    /// The upstream was slow or unreachable.
    Timeout,
}

/// Fetches the current repository content for one sync cycle.
pub struct RrdpFetcher {
    config: Config,
    downloader: Arc<dyn Downloader>,
    processor: SnapshotProcessor,
}

impl RrdpFetcher {
    pub fn new(
        config: Config,
        downloader: Arc<dyn Downloader>,
        state: Arc<State>,
        metrics: Arc<dyn FetcherMetrics>,
        log_filter: Arc<LogFilter>,
    ) -> Self {
        info!(url = %config.rrdp_url, "RrdpFetcher created");
        Self {
            config,
            downloader,
            processor: SnapshotProcessor::new(state, metrics, log_filter),
        }
    }

    /// Fetch the notification and, when it changed, the snapshot.
    ///
    /// Never fails: every error is folded into the returned [`FetchResult`].
    pub async fn fetch_objects(&self) -> FetchResult {
        let outcome = async {
            let notification = self.downloader.download(&self.config.rrdp_url).await?;
            self.process_notification_xml(&notification.content).await
        }
        .await;

        match outcome {
            Ok(result) => result,
            Err(e) if e.is_timeout() => {
                info!(url = %self.config.rrdp_url, error = %e, "Timeout while loading RRDP repo");
                FetchResult::Timeout
            }
            Err(error) => FetchResult::FailedFetch { error },
        }
    }

    /// Process a notification document, downloading the snapshot it references
    /// unless the session and serial are unchanged.
    pub async fn process_notification_xml(&self, notification_bytes: &[u8]) -> Result<FetchResult> {
        let notification = parse_notification(notification_bytes)?;

        if let Some(current) = self.processor.state.rrdp_state()
            && current.is_at(&notification.session_id, notification.serial)
        {
            info!(
                session_id = %notification.session_id,
                serial = notification.serial,
                "Not updating: session_id and serial are the same as previous run"
            );
            return Ok(FetchResult::NoUpdates {
                session_id: notification.session_id,
                serial: notification.serial,
            });
        }

        let snapshot_url = self.config.substitute_host(&notification.snapshot_url);
        info!(url = %snapshot_url, "Loading RRDP snapshot");
        let started = Instant::now();
        let downloaded = self.downloader.download(&snapshot_url).await?;
        let elapsed = started.elapsed();
        self.processor.metrics.snapshot_download_time(elapsed);
        info!(elapsed_ms = elapsed.as_millis() as u64, "Downloaded snapshot");

        let content = downloaded.content;
        if content.is_empty() {
            return Err(RrdpError::snapshot(
                &notification.snapshot_url,
                "Empty snapshot",
            ));
        }
        match ContentHash::verify(&content, &notification.snapshot_hash) {
            Ok(_) => {}
            Err(rsyncit_core::Error::HashMismatch {
                expected,
                actual,
                len,
            }) => {
                return Err(RrdpError::snapshot(
                    &notification.snapshot_url,
                    format!(
                        "with len(content) = {len} had sha256(content) = {actual}, expected {expected}"
                    ),
                ));
            }
            Err(e) => return Err(RrdpError::snapshot(&notification.snapshot_url, e.to_string())),
        }

        let processor = self.processor.clone();
        let url = notification.snapshot_url.clone();
        let serial = notification.serial;
        let last_modified = downloaded.last_modified;
        let objects = tokio::task::spawn_blocking(move || {
            processor.process(&content, &url, serial, last_modified, OffsetDateTime::now_utc())
        })
        .await
        .map_err(|e| RrdpError::Worker(e.to_string()))??;

        Ok(FetchResult::SuccessfulFetch {
            objects,
            session_id: notification.session_id,
            serial: notification.serial,
        })
    }
}

/// Turns a verified snapshot document into deduplicated objects.
#[derive(Clone)]
pub struct SnapshotProcessor {
    state: Arc<State>,
    metrics: Arc<dyn FetcherMetrics>,
    log_filter: Arc<LogFilter>,
}

impl SnapshotProcessor {
    pub fn new(
        state: Arc<State>,
        metrics: Arc<dyn FetcherMetrics>,
        log_filter: Arc<LogFilter>,
    ) -> Self {
        Self {
            state,
            metrics,
            log_filter,
        }
    }

    /// Parse, decode and timestamp every `<publish>` element.
    ///
    /// `now` marks the objects in the timestamp cache.
    #[instrument(skip(self, content, last_modified, now), fields(len = content.len()))]
    pub fn process(
        &self,
        content: &[u8],
        url: &str,
        serial: u64,
        last_modified: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Result<Vec<RpkiObject>> {
        let snapshot = parse_snapshot(content, url, serial)?;

        if last_modified.is_none() {
            info!("No last-modified header in response: using current hour as timestamp");
        }
        let fallback = fallback_timestamp(last_modified, now);

        let started = Instant::now();
        let objects = snapshot
            .publishes
            .par_iter()
            .map(|publish| self.build_object(publish, fallback, now))
            .collect::<Result<Vec<_>>>()?;
        self.metrics.object_construction_time(started.elapsed());

        let (objects, collisions) = deduplicate_by_url(objects);
        if collisions > 0 {
            self.metrics.url_collisions(collisions);
        }
        info!(count = objects.len(), "Parsed objects");
        Ok(objects)
    }

    fn build_object(
        &self,
        publish: &PublishElement,
        fallback: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<RpkiObject> {
        let decoded = decode_base64(&publish.content).map_err(|e| {
            self.metrics.bad_object();
            error!(uri = %publish.uri, content = %publish.content, "Cannot decode object data");
            RrdpError::Decode {
                uri: publish.uri.clone(),
                message: e.to_string(),
            }
        })?;

        let hash = ContentHash::compute(&decoded);
        let modification_time = self.state.cache_timestamp(&hash.to_hex(), now, || {
            let t = resolve_timestamp(&publish.uri, &decoded, fallback, |e| {
                self.metrics.bad_object();
                if self.log_filter.first_time(&hash) {
                    error!(
                        uri = %publish.uri,
                        hash = %hash,
                        error = %e,
                        body = %STANDARD.encode(&decoded),
                        "Could not parse the object"
                    );
                }
            });
            incorporate_hash_in_timestamp(t, &hash)
        });

        Ok(RpkiObject::new(
            publish.uri.clone(),
            Bytes::from(decoded),
            modification_time,
        ))
    }
}

/// Standard alphabet, with or without trailing `=` padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// xsd:base64Binary allows whitespace around and inside the content.
fn decode_base64(content: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT.decode(compact)
}

/// Keep the first object for every URL, in document order.
///
/// Returns the surviving objects and the number dropped.
pub fn deduplicate_by_url(objects: Vec<RpkiObject>) -> (Vec<RpkiObject>, usize) {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(objects.len());
    let mut kept: Vec<RpkiObject> = Vec::with_capacity(objects.len());
    let mut duplicates: Vec<(usize, Vec<ContentHash>)> = Vec::new();
    let mut dropped = 0;

    for object in objects {
        match index.entry(object.url.clone()) {
            Entry::Occupied(entry) => {
                let first = *entry.get();
                match duplicates.iter_mut().find(|(i, _)| *i == first) {
                    Some((_, hashes)) => hashes.push(object.content_hash()),
                    None => duplicates.push((
                        first,
                        vec![kept[first].content_hash(), object.content_hash()],
                    )),
                }
                dropped += 1;
            }
            Entry::Vacant(entry) => {
                entry.insert(kept.len());
                kept.push(object);
            }
        }
    }

    for (first, hashes) in &duplicates {
        let hashes = hashes
            .iter()
            .map(ContentHash::to_hex)
            .collect::<Vec<_>>()
            .join(", ");
        warn!(url = %kept[*first].url, hashes = %hashes, "Multiple objects for url, keeping first element");
    }

    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn object(url: &str, content: &[u8]) -> RpkiObject {
        RpkiObject::new(
            url,
            Bytes::copy_from_slice(content),
            datetime!(2024-01-01 00:00:00 UTC),
        )
    }

    #[test]
    fn test_deduplicate_keeps_first_in_document_order() {
        let objects = vec![
            object("rsync://h/a.cer", b"first"),
            object("rsync://h/b.cer", b"other"),
            object("rsync://h/a.cer", b"second"),
            object("rsync://h/a.cer", b"third"),
        ];
        let (kept, dropped) = deduplicate_by_url(objects);
        assert_eq!(dropped, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].url, "rsync://h/a.cer");
        assert_eq!(&kept[0].bytes[..], b"first");
        assert_eq!(kept[1].url, "rsync://h/b.cer");
    }

    #[test]
    fn test_decode_base64_tolerates_whitespace() {
        assert_eq!(decode_base64("\n  AAEC\n  ").unwrap(), vec![0, 1, 2]);
        assert_eq!(decode_base64("AA\r\nEC").unwrap(), vec![0, 1, 2]);
        assert!(decode_base64("not base64!").is_err());
    }

    #[test]
    fn test_decode_base64_padding_is_optional() {
        assert_eq!(decode_base64("AAE").unwrap(), vec![0, 1]);
        assert_eq!(decode_base64("AAE=").unwrap(), vec![0, 1]);
        assert_eq!(decode_base64("AA\nE").unwrap(), vec![0, 1]);
        assert!(decode_base64("A").is_err());
    }
}
