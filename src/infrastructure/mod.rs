//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// CRM backend REST client.
pub mod crm;
/// System notifications.
pub mod notifications;
/// Socket.IO live update client.
pub mod socket;
/// Token and read-marker storage.
pub mod storage;

pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use crm::CrmClient;
pub use notifications::DesktopNotificationService;
pub use socket::{SocketClient, SocketClientConfig};
pub use storage::{FileMarkerRepository, InMemoryMarkerRepository, KeyringTokenStorage};
