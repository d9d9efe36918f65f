#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use rsyncit_rrdp::{Downloaded, Downloader, HttpError};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Clone)]
enum Response {
    Body(Bytes),
    Timeout,
}

/// In-memory downloader that counts requests per URL.
///
/// When `hold` is set, each download signals `entered` and then waits on
/// `release` before answering.
#[derive(Default)]
pub struct StubDownloader {
    responses: Mutex<HashMap<String, Response>>,
    calls: Mutex<HashMap<String, usize>>,
    hold: Mutex<bool>,
    pub entered: Notify,
    pub release: Notify,
}

impl StubDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: impl Into<Bytes>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Body(body.into()));
    }

    pub fn time_out(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::Timeout);
    }

    pub fn hold_requests(&self, hold: bool) {
        *self.hold.lock().unwrap() = hold;
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Downloader for StubDownloader {
    async fn download(&self, url: &str) -> Result<Downloaded, HttpError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let hold = *self.hold.lock().unwrap();
        if hold {
            self.entered.notify_one();
            self.release.notified().await;
        }
        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(Response::Body(content)) => Ok(Downloaded {
                content,
                last_modified: None,
            }),
            Some(Response::Timeout) => Err(HttpError::Timeout {
                url: url.to_string(),
            }),
            None => Err(HttpError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
