use parking_lot::Mutex;

use crate::domain::entities::ReadStatusData;
use crate::domain::errors::StorageError;
use crate::domain::ports::MarkerRepository;

/// Process-local marker store. Used when no data directory is available.
#[derive(Default)]
pub struct InMemoryMarkerRepository {
    data: Mutex<ReadStatusData>,
}

impl InMemoryMarkerRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkerRepository for InMemoryMarkerRepository {
    fn get(&self) -> Result<ReadStatusData, StorageError> {
        Ok(self.data.lock().clone())
    }

    fn set(&self, data: &ReadStatusData) -> Result<(), StorageError> {
        *self.data.lock() = data.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.data.lock() = ReadStatusData::new();
        Ok(())
    }
}
