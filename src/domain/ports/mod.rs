mod auth_port;
mod crm_data_port;
mod directory_port;
mod marker_repository;
mod notification_port;
mod socket_port;
mod token_storage_port;

pub use auth_port::{AuthPort, LoginCredentials};
pub use crm_data_port::{CrmDataPort, SendMessageRequest, ViewFilter};
pub use directory_port::{CreateCustomerRequest, DirectoryPort, UpdateCustomerRequest};
pub use marker_repository::MarkerRepository;
pub use notification_port::{DesktopNotification, NotificationPermission, NotificationPort};
pub use socket_port::{
    ListenerRegistry, SocketCommand, SocketEvent, SocketEventKind, SocketPort, Subscription,
    SubscriptionId,
};
pub use token_storage_port::TokenStoragePort;

#[cfg(test)]
pub mod mocks {
    pub use super::auth_port::mock::MockAuthPort;
    pub use super::crm_data_port::MockCrmDataPort;
    pub use super::notification_port::mock::MockNotificationPort;
    pub use super::socket_port::mock::FakeSocket;
    pub use super::token_storage_port::mock::MockTokenStorage;
}
