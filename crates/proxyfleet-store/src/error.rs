//! Error types for blob storage and state persistence.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing blobs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read error at '{0}': {1}")]
    Read(String, String),

    #[error("write error at '{0}': {1}")]
    Write(String, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error at '{0}': {1}")]
    Deserialize(String, String),
}
