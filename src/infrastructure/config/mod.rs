//! Application configuration.

pub mod app_config;
/// Command-line arguments.
pub mod args;
/// On-disk configuration file handling.
pub mod storage;

pub use app_config::{AppConfig, LogLevel, NotificationsConfig, SyncConfig};
pub use args::{CliArgs, Command};
pub use storage::{ConfigError, StorageManager};
