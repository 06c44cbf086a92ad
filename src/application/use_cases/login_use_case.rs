//! Login use case implementation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::{LoginRequest, LoginResponse};
use crate::domain::errors::ApiError;
use crate::domain::ports::{AuthPort, TokenStoragePort};

/// Handles the email/password login workflow.
#[derive(Clone)]
pub struct LoginUseCase {
    auth_port: Arc<dyn AuthPort>,
    storage_port: Arc<dyn TokenStoragePort>,
}

impl LoginUseCase {
    /// Creates new login use case.
    #[must_use]
    pub const fn new(
        auth_port: Arc<dyn AuthPort>,
        storage_port: Arc<dyn TokenStoragePort>,
    ) -> Self {
        Self {
            auth_port,
            storage_port,
        }
    }

    /// Exchanges credentials for a token and optionally stores it.
    ///
    /// # Errors
    /// Returns error if credentials are missing or rejected.
    pub async fn execute(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        let credentials = &request.credentials;
        debug!(email = %credentials.email, "Attempting login");

        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(ApiError::unauthorized("email and password are required"));
        }

        let (token, user) = self.auth_port.login(credentials).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            e
        })?;

        info!(
            user_id = %user.id,
            email = %user.email,
            role = %user.role,
            "Successfully authenticated"
        );

        let token_persisted = if request.persist_token {
            match self.storage_port.store_token(&token).await {
                Ok(()) => {
                    info!("Token persisted to secure storage");
                    true
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist token to secure storage");
                    false
                }
            }
        } else {
            debug!("Token persistence disabled, skipping storage");
            false
        };

        Ok(LoginResponse::new(user, token, token_persisted))
    }

    /// Deletes the stored token.
    ///
    /// # Errors
    /// Returns error if deletion fails.
    pub async fn logout(&self) -> Result<(), ApiError> {
        debug!("Deleting token from secure storage");
        match self.storage_port.delete_token().await {
            Ok(()) => {
                info!("Token deleted from secure storage");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete token from secure storage");
                Err(e)
            }
        }
    }
}
