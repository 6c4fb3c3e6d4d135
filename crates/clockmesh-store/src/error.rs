//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested frame or key does not exist.
    ///
    /// Expected absence, not a fault: the sync server answers it with an
    /// empty payload, the key handler drops the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored bytes failed validation or decoding.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True if this error means "the record is simply absent".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<clockmesh_core::CoreError> for StoreError {
    fn from(err: clockmesh_core::CoreError) -> Self {
        StoreError::InvalidData(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
