//! Directory port for desk accounts and customers.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::entities::{Customer, CustomerId, User, UserId, UserRole};
use crate::domain::errors::ApiError;

/// Body of `POST /customers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    /// Contact name, required by the backend.
    pub name: String,
    /// WhatsApp number in international format.
    pub phone_number: String,
    /// Optional contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Body of `PATCH /customers/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    /// New contact name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New WhatsApp number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// New contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UpdateCustomerRequest {
    /// Whether the request would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone_number.is_none() && self.email.is_none()
    }
}

/// Port for user and customer administration.
///
/// Role changes and deletions are admin-only; agents get `ApiError::Forbidden`.
#[async_trait]
pub trait DirectoryPort: Send + Sync {
    /// Lists every desk account.
    async fn fetch_users(&self) -> Result<Vec<User>, ApiError>;

    /// Changes an account's role.
    async fn update_user_role(&self, id: UserId, role: UserRole) -> Result<User, ApiError>;

    /// Removes an account.
    async fn delete_user(&self, id: UserId) -> Result<(), ApiError>;

    /// Lists customers.
    async fn fetch_customers(&self) -> Result<Vec<Customer>, ApiError>;

    /// Fetches one customer.
    async fn fetch_customer(&self, id: CustomerId) -> Result<Customer, ApiError>;

    /// Registers a customer.
    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<Customer, ApiError>;

    /// Applies the present fields of `request`.
    async fn update_customer(
        &self,
        id: CustomerId,
        request: UpdateCustomerRequest,
    ) -> Result<Customer, ApiError>;

    /// Removes a customer.
    async fn delete_customer(&self, id: CustomerId) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_skips_absent_fields() {
        let request = UpdateCustomerRequest {
            name: Some("Maria".to_string()),
            ..UpdateCustomerRequest::default()
        };

        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"name":"Maria"}"#);
        assert!(!request.is_empty());
        assert!(UpdateCustomerRequest::default().is_empty());
    }
}
