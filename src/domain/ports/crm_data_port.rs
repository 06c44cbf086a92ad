//! CRM data port for conversations, messages and unread state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    Conversation, ConversationId, ConversationStatus, CustomerId, Message, MessageId, UserId,
};
use crate::domain::errors::ApiError;

/// Which conversations the agent is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewFilter {
    /// Every conversation of the desk.
    #[default]
    All,
    /// Only conversations assigned to the current agent.
    Mine,
}

/// Body of `POST /messages/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Recipient customer.
    pub customer_id: CustomerId,
    /// Trimmed text body.
    pub content: String,
    /// Recipient WhatsApp number.
    pub phone_number: String,
}

impl SendMessageRequest {
    /// Addresses `content` to the customer of `conversation`.
    #[must_use]
    pub fn new(conversation: &Conversation, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation.id,
            customer_id: conversation.customer_id,
            content: content.into(),
            phone_number: conversation.customer.phone_number.clone(),
        }
    }
}

/// Port for the CRM REST backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmDataPort: Send + Sync {
    /// Fetches conversations, optionally restricted to a status.
    async fn fetch_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, ApiError>;

    /// Fetches conversations assigned to the current agent.
    async fn fetch_my_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// Fetches a single conversation.
    async fn fetch_conversation(&self, id: ConversationId) -> Result<Conversation, ApiError>;

    /// Assigns a conversation to an agent.
    async fn assign_conversation(
        &self,
        id: ConversationId,
        user_id: UserId,
    ) -> Result<Conversation, ApiError>;

    /// Changes the workflow status of a conversation.
    async fn update_conversation_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> Result<Conversation, ApiError>;

    /// Fetches the full message history of a conversation.
    async fn fetch_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, ApiError>;

    /// Sends a text message to the customer of a conversation.
    async fn send_message(&self, request: SendMessageRequest) -> Result<Message, ApiError>;

    /// Marks a single message read on the backend.
    async fn mark_message_read(&self, id: MessageId) -> Result<Message, ApiError>;

    /// Marks every message of a conversation read on the backend.
    async fn mark_conversation_read(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, ApiError>;

    /// Authoritative unread count, globally or for one conversation.
    async fn fetch_unread_count(
        &self,
        conversation_id: Option<ConversationId>,
    ) -> Result<u64, ApiError>;

    /// Authoritative unread messages, globally or for one conversation.
    async fn fetch_unread_messages(
        &self,
        conversation_id: Option<ConversationId>,
    ) -> Result<Vec<Message>, ApiError>;
}
