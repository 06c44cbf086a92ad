//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::domain::ports::ViewFilter;

pub(super) const APP_NAME: &str = "chatdesk";
pub(super) const APP_QUALIFIER: &str = "io";
pub(super) const APP_ORGANIZATION: &str = "chatdesk";

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// Log level configuration.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Settings read from `config.toml`, overridable from the command line.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Base url of the REST backend.
    #[serde(default = "default_backend_url")]
    pub api_url: String,

    /// Base url of the Socket.IO endpoint.
    #[serde(default = "default_backend_url")]
    pub ws_url: String,

    /// Minimum level written to the log file.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Unread polling settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Desktop notification settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// `[sync]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between unread refreshes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Conversation list shown at startup.
    #[serde(default)]
    pub view_filter: ViewFilter,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            view_filter: ViewFilter::default(),
        }
    }
}

/// `[notifications]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Show desktop notifications for critical unread messages.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(api_url) = &args.api_url {
            self.api_url.clone_from(api_url);
        }
        if let Some(ws_url) = &args.ws_url {
            self.ws_url.clone_from(ws_url);
        }
        if let Some(secs) = args.poll_interval {
            self.sync.poll_interval_secs = secs;
        }
        if args.no_notifications {
            self.notifications.enabled = false;
        }
    }

    /// Refresh period, never shorter than one second.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
    }

    /// Directory holding the read-marker file and the log.
    #[must_use]
    pub fn default_data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Default log file location.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        Self::default_data_dir().map(|dir| dir.join("chatdesk.log"))
    }

    /// Log path from the command line, falling back to the default.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            api_url: default_backend_url(),
            ws_url: default_backend_url(),
            log_level: LogLevel::Info,
            sync: SyncConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            api_url = "https://desk.example.com/api"

            [sync]
            view_filter = "mine"
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.api_url, "https://desk.example.com/api");
        assert_eq!(config.ws_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.sync.view_filter, ViewFilter::Mine);
        assert_eq!(config.sync.poll_interval_secs, 30);
        assert!(config.notifications.enabled);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.sync.view_filter, ViewFilter::All);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from([
            "chatdesk",
            "--api-url",
            "http://10.0.0.2:3000",
            "--poll-interval",
            "0",
            "--no-notifications",
            "--log-level",
            "debug",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.api_url, "http://10.0.0.2:3000");
        assert_eq!(config.ws_url, DEFAULT_BACKEND_URL);
        assert!(!config.notifications.enabled);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
