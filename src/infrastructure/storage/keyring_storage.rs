//! Keyring-based token storage.

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::domain::entities::AuthToken;
use crate::domain::errors::ApiError;
use crate::domain::ports::TokenStoragePort;

const KEYRING_SERVICE: &str = "chatdesk";
const KEYRING_USER: &str = "access-token";

/// Keeps the backend access token in the system keyring.
pub struct KeyringTokenStorage {
    service: String,
    user: String,
}

impl KeyringTokenStorage {
    /// Creates new storage with default names.
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(KEYRING_SERVICE, KEYRING_USER)
    }

    /// Creates storage with custom names.
    #[must_use]
    pub fn with_names(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> Result<Entry, ApiError> {
        Entry::new(&self.service, &self.user)
            .map_err(|e| ApiError::retrieval_failed(format!("failed to access keyring: {e}")))
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStoragePort for KeyringTokenStorage {
    async fn get_token(&self) -> Result<Option<AuthToken>, ApiError> {
        debug!(service = %self.service, "Reading access token from keyring");

        match self.entry()?.get_password() {
            Ok(stored) => {
                let token = AuthToken::new(stored);
                if token.is_none() {
                    warn!("Stored access token is malformed, ignoring it");
                }
                Ok(token)
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No access token in keyring");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Failed to read access token from keyring");
                Err(ApiError::retrieval_failed(e.to_string()))
            }
        }
    }

    async fn store_token(&self, token: &AuthToken) -> Result<(), ApiError> {
        self.entry()?.set_password(token.as_str()).map_err(|e| {
            warn!(error = %e, "Failed to store access token in keyring");
            ApiError::storage_failed(e.to_string())
        })?;

        debug!(service = %self.service, token = %token, "Access token stored");
        Ok(())
    }

    async fn delete_token(&self) -> Result<(), ApiError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "Access token removed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to delete access token from keyring");
                Err(ApiError::storage_failed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires system keyring"]
    async fn test_store_and_retrieve_token() {
        let storage = KeyringTokenStorage::with_names("chatdesk-test", "test-token");
        let token = AuthToken::new_unchecked(
            "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOjF9.c2lnbmF0dXJlLXZhbHVl",
        );

        storage.store_token(&token).await.unwrap();

        let retrieved = storage.get_token().await.unwrap();
        assert_eq!(retrieved.unwrap().as_str(), token.as_str());

        storage.delete_token().await.unwrap();
        assert!(!storage.has_token().await.unwrap());
    }
}
