//! Persistence of the backend access token between runs.

use async_trait::async_trait;

use crate::domain::entities::AuthToken;
use crate::domain::errors::ApiError;

/// Keeps the JWT issued by `POST /auth/login`.
///
/// Only one token is stored at a time. Implementations hide a stored value
/// that is not a well-formed JWT instead of failing, so a corrupted entry
/// behaves like a logged-out state.
#[async_trait]
pub trait TokenStoragePort: Send + Sync {
    /// Stored token, or `None` when nothing usable is stored.
    ///
    /// # Errors
    /// Returns `ApiError::TokenRetrievalFailed` when the store cannot be read.
    async fn get_token(&self) -> Result<Option<AuthToken>, ApiError>;

    /// Saves the token, replacing any previous one.
    ///
    /// # Errors
    /// Returns `ApiError::TokenStorageFailed` when the store rejects the write.
    async fn store_token(&self, token: &AuthToken) -> Result<(), ApiError>;

    /// Forgets the stored token.
    ///
    /// Succeeds when nothing is stored, so logging out twice is harmless.
    ///
    /// # Errors
    /// Returns `ApiError::TokenStorageFailed` when an existing entry cannot be removed.
    async fn delete_token(&self) -> Result<(), ApiError>;

    /// Whether a usable token is stored.
    ///
    /// # Errors
    /// Propagates the failure of [`get_token`](Self::get_token).
    async fn has_token(&self) -> Result<bool, ApiError> {
        Ok(self.get_token().await?.is_some())
    }
}
