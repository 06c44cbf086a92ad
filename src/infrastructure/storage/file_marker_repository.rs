//! Read markers persisted as a JSON file.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::entities::ReadStatusData;
use crate::domain::errors::StorageError;
use crate::domain::ports::MarkerRepository;

/// Name of the marker file, shared with the browser dashboard's storage key.
pub const MARKER_FILE_NAME: &str = "whatsapp_dashboard_read_conversations.json";

/// Stores every marker in one JSON object, rewritten atomically on each change.
pub struct FileMarkerRepository {
    path: PathBuf,
}

impl FileMarkerRepository {
    /// Repository backed by the file at `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Repository using the default file name inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(MARKER_FILE_NAME))
    }

    /// Location of the marker file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarkerRepository for FileMarkerRepository {
    fn get(&self) -> Result<ReadStatusData, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ReadStatusData::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(ReadStatusData::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn set(&self, data: &ReadStatusData) -> Result<(), StorageError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| StorageError::NotAvailable(self.path.display().to_string()))?;
        fs::create_dir_all(parent)?;

        let content = serde_json::to_vec(data)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(&content)?;
        temp_file
            .persist(&self.path)
            .map_err(|e| StorageError::PersistFailed(e.error.to_string()))?;

        debug!(path = %self.path.display(), markers = data.len(), "Read markers saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
