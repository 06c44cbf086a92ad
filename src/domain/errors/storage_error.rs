//! Local storage error types.

use thiserror::Error;

/// Failures of the local read-marker storage.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage location not available: {0}")]
    NotAvailable(String),

    #[error("failed to persist stored data: {0}")]
    PersistFailed(String),
}
