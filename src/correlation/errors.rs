use thiserror::Error;

/// Errors raised by the correlation store backends
#[derive(Error, Debug)]
pub enum CorrelationError {
    /// No event under the key, or the entry outlived its TTL
    #[error("No client event stored under key {0}")]
    NotFound(String),

    /// Backend failure (LMDB environment, transaction or I/O)
    #[error("Correlation storage error: {0}")]
    Storage(String),

    #[error("Failed to serialize client event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The blocking storage task panicked or was cancelled
    #[error("Correlation storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<heed::Error> for CorrelationError {
    fn from(error: heed::Error) -> Self {
        CorrelationError::Storage(error.to_string())
    }
}
