use reqwest::StatusCode;
use thiserror::Error;

/// Contract violations reported by the feed view-model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("invalid headline payload: {0}")]
    InvalidInput(String),
    #[error("headline index {index} out of range (visible: {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Failures talking to the headline/weather backend.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("invalid JSON from backend: {0}")]
    Decode(#[from] serde_json::Error),
}
