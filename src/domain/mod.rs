//! Domain layer with core business entities, unread rules and port definitions.

/// Connection status definitions.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Pure domain rules.
pub mod services;

pub use connection::ConnectionStatus;
pub use entities::{AuthToken, User};
pub use errors::{ApiError, StorageError};
pub use ports::{AuthPort, CrmDataPort, MarkerRepository, SocketPort, TokenStoragePort};
