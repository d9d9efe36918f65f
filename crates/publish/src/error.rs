use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid rsync base directory: {0}")]
    InvalidBaseDirectory(String),

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

pub type Result<T> = std::result::Result<T, PublishError>;
