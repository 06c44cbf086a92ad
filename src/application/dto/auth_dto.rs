//! Authentication DTOs.

use crate::domain::entities::{AuthToken, User};
use crate::domain::ports::LoginCredentials;

/// Source of the authentication token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Token issued by an interactive login.
    Login,
    /// Token passed as a flag or environment variable.
    CommandLine,
    /// Token from system keyring.
    Keyring,
}

impl TokenSource {
    /// Returns human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::CommandLine => "command line / environment",
            Self::Keyring => "system keyring",
        }
    }
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Login request data.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Email and password.
    pub credentials: LoginCredentials,
    /// Whether to persist the issued token.
    pub persist_token: bool,
}

impl LoginRequest {
    /// Creates new login request that persists the token.
    #[must_use]
    pub const fn new(credentials: LoginCredentials) -> Self {
        Self {
            credentials,
            persist_token: true,
        }
    }

    /// Disables token persistence.
    #[must_use]
    pub const fn without_persistence(mut self) -> Self {
        self.persist_token = false;
        self
    }
}

/// Login response data.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    /// Authenticated account.
    pub user: User,
    /// Issued access token.
    pub token: AuthToken,
    /// Whether the token reached the keyring.
    pub token_persisted: bool,
}

impl LoginResponse {
    /// Creates new login response.
    #[must_use]
    pub const fn new(user: User, token: AuthToken, token_persisted: bool) -> Self {
        Self {
            user,
            token,
            token_persisted,
        }
    }
}
