use std::path::PathBuf;

/// Errors from blob store and dedup index operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage root could not be prepared.
    #[error("storage root {path} unavailable: {reason}")]
    RootUnavailable { path: PathBuf, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
