//! Error types for RRDP fetching.

use thiserror::Error;

/// Errors raised while downloading a document.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected HTTP status {status} fetching {url}")]
    Status { url: String, status: u16 },
}

/// Errors raised while processing a notification or snapshot.
#[derive(Debug, Error)]
pub enum RrdpError {
    #[error("{0}")]
    NotificationStructure(String),

    #[error("Structure of snapshot at {url} did not match expected structure: {message}")]
    SnapshotStructure { url: String, message: String },

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("invalid value for attribute {attribute}: '{value}'")]
    InvalidAttribute { attribute: String, value: String },

    #[error("could not decode content of {uri}: {message}")]
    Decode { uri: String, message: String },

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("snapshot worker failed: {0}")]
    Worker(String),
}

impl RrdpError {
    pub(crate) fn snapshot(url: &str, message: impl Into<String>) -> Self {
        Self::SnapshotStructure {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error means the upstream was slow or unreachable.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Http(HttpError::Timeout { .. } | HttpError::Transport { .. })
        )
    }
}

impl From<xml::reader::Error> for RrdpError {
    fn from(e: xml::reader::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

/// Errors raised while reading the time carried by a repository object.
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("cannot decode {kind}: {message}")]
    Decode { kind: &'static str, message: String },

    #[error("signed object has no signing-time attribute")]
    MissingSigningTime,

    #[error("object time out of range: {0}")]
    OutOfRange(#[from] time::error::ComponentRange),
}

/// Result type alias for RRDP operations.
pub type Result<T> = std::result::Result<T, RrdpError>;
