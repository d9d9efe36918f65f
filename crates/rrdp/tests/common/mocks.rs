#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use rsyncit_rrdp::{Downloaded, Downloader, FetcherMetrics, HttpError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Clone)]
enum Response {
    Body(Bytes, Option<OffsetDateTime>),
    Timeout,
    Status(u16),
}

/// In-memory downloader that counts requests per URL.
#[derive(Default)]
pub struct StubDownloader {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: impl Into<Bytes>, last_modified: Option<OffsetDateTime>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Body(body.into(), last_modified));
    }

    pub fn time_out(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Timeout);
    }

    pub fn fail_with_status(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Status(status));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Downloader for StubDownloader {
    async fn download(&self, url: &str) -> Result<Downloaded, HttpError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(Response::Body(content, last_modified)) => Ok(Downloaded {
                content,
                last_modified,
            }),
            Some(Response::Timeout) => Err(HttpError::Timeout {
                url: url.to_string(),
            }),
            Some(Response::Status(status)) => Err(HttpError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(HttpError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Counts the hooks the fetcher invokes.
#[derive(Default)]
pub struct RecordingMetrics {
    pub bad_objects: AtomicUsize,
    pub url_collisions: AtomicUsize,
    pub snapshot_downloads: AtomicUsize,
    pub object_constructions: AtomicUsize,
}

impl FetcherMetrics for RecordingMetrics {
    fn bad_object(&self) {
        self.bad_objects.fetch_add(1, Ordering::SeqCst);
    }

    fn url_collisions(&self, count: usize) {
        self.url_collisions.fetch_add(count, Ordering::SeqCst);
    }

    fn snapshot_download_time(&self, _elapsed: Duration) {
        self.snapshot_downloads.fetch_add(1, Ordering::SeqCst);
    }

    fn object_construction_time(&self, _elapsed: Duration) {
        self.object_constructions.fetch_add(1, Ordering::SeqCst);
    }
}
