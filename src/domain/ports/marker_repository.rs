//! Read-marker storage port.

use crate::domain::entities::ReadStatusData;
use crate::domain::errors::StorageError;

/// Key-value storage for read markers.
///
/// Access is synchronous; implementations must be cheap enough to call from
/// inside event handlers.
pub trait MarkerRepository: Send + Sync {
    /// Loads every stored marker. A missing store yields empty data.
    ///
    /// # Errors
    /// Returns `StorageError` if the store cannot be read or decoded.
    fn get(&self) -> Result<ReadStatusData, StorageError>;

    /// Replaces the stored markers.
    ///
    /// # Errors
    /// Returns `StorageError` if the data cannot be encoded or written.
    fn set(&self, data: &ReadStatusData) -> Result<(), StorageError>;

    /// Removes every stored marker.
    ///
    /// # Errors
    /// Returns `StorageError` if the store cannot be removed.
    fn clear(&self) -> Result<(), StorageError>;
}
