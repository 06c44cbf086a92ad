use super::app_config::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "chatdesk",
    version,
    about = "Unread tracking and live alerts for a WhatsApp customer desk",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Base url of the REST backend.
    #[arg(long, env = "CHATDESK_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Base url of the Socket.IO endpoint.
    #[arg(long, env = "CHATDESK_WS_URL", value_name = "URL", global = true)]
    pub ws_url: Option<String>,

    /// Access token. Takes precedence over the one stored in the keyring.
    #[arg(long, env = "CHATDESK_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Seconds between unread refreshes.
    #[arg(long, value_name = "SECS", global = true)]
    pub poll_interval: Option<u64>,

    /// Disable desktop notifications.
    #[arg(long, global = true)]
    pub no_notifications: bool,

    /// Subcommand, `watch` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// Subcommand to run, `watch` when none was given.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }
}

/// Available subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Follow unread messages and conversation updates live.
    Watch,
    /// Log in and store the access token in the system keyring.
    Login {
        /// Account email.
        #[arg(long, short)]
        email: String,
        /// Read from standard input when omitted.
        #[arg(long, short)]
        password: Option<String>,
        /// Do not store the token.
        #[arg(long)]
        no_store: bool,
    },
    /// Remove the stored access token.
    Logout,
    /// List customers.
    Customers,
    /// List desk users.
    Users,
    /// Forget every local read marker.
    ResetMarkers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&["chatdesk"], Command::Watch ; "defaults to watch")]
    #[test_case(&["chatdesk", "logout"], Command::Logout ; "logout")]
    #[test_case(&["chatdesk", "reset-markers"], Command::ResetMarkers ; "reset markers")]
    fn test_subcommand(argv: &[&str], expected: Command) {
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert_eq!(args.command(), expected);
    }

    #[test]
    fn test_login_arguments() {
        let args =
            CliArgs::try_parse_from(["chatdesk", "login", "-e", "agent@desk.io", "--no-store"])
                .unwrap();

        assert_eq!(
            args.command(),
            Command::Login {
                email: "agent@desk.io".to_string(),
                password: None,
                no_store: true,
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from(["chatdesk", "users", "--api-url", "http://x:1"]).unwrap();
        assert_eq!(args.api_url.as_deref(), Some("http://x:1"));
    }
}
