//! HTTP download of notification and snapshot documents.

use async_trait::async_trait;
use bytes::Bytes;
use rsyncit_core::Config;
use std::time::Duration;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::HttpError;

/// A downloaded document.
#[derive(Clone, Debug)]
pub struct Downloaded {
    pub content: Bytes,
    /// Parsed `Last-Modified` response header, when present and well-formed.
    pub last_modified: Option<OffsetDateTime>,
}

/// Source of RRDP documents.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Downloaded, HttpError>;
}

/// [`Downloader`] backed by reqwest.
#[derive(Clone)]
pub struct HttpDownloader {
    http: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, HttpError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { http })
    }

    /// Client using the configured User-Agent and request timeout.
    pub fn from_config(config: &Config) -> Result<Self, HttpError> {
        Self::new(&config.user_agent, config.request_timeout)
    }
}

fn classify(url: &str, e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout {
            url: url.to_string(),
        }
    } else {
        HttpError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Downloaded, HttpError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);

        let content = response.bytes().await.map_err(|e| classify(url, e))?;
        Ok(Downloaded {
            content,
            last_modified,
        })
    }
}

/// Parse an IMF-fixdate HTTP date, e.g. `Tue, 11 Apr 2023 04:42:30 GMT`.
pub fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    PrimitiveDateTime::parse(value.trim(), format)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}
