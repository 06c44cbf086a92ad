//! Local persistence: access token and read markers.

mod file_marker_repository;
mod keyring_storage;
mod memory_marker_repository;

pub use file_marker_repository::{FileMarkerRepository, MARKER_FILE_NAME};
pub use keyring_storage::KeyringTokenStorage;
pub use memory_marker_repository::InMemoryMarkerRepository;
