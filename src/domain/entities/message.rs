use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ConversationId, Customer, CustomerId, User, UserId};
use crate::domain::services::unread;

/// Unique identifier for a desk message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// WhatsApp payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Document,
    Audio,
    Template,
}

/// Whether the customer or the desk sent the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// Delivery state reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
    Failed,
}

/// A message exchanged in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message id.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Customer on the other end of the conversation.
    pub customer_id: CustomerId,
    /// Agent who sent an outbound message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Payload kind.
    #[serde(default)]
    pub message_type: MessageType,
    /// Sender side.
    pub direction: MessageDirection,
    /// Text body, or the caption of a media message.
    #[serde(default)]
    pub content: String,
    /// Location of the attached media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Delivery state.
    #[serde(default)]
    pub status: MessageStatus,
    /// Creation time on the server.
    pub created_at: DateTime<Utc>,
    /// When an agent read the message, if ever.
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    /// Embedded sending agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Embedded customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
}

impl Message {
    /// Creates a text message with `Sent` status and no read receipt.
    #[must_use]
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        direction: MessageDirection,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            customer_id,
            user_id: None,
            message_type: MessageType::Text,
            direction,
            content: content.into(),
            media_url: None,
            status: MessageStatus::Sent,
            created_at: Utc::now(),
            read_at: None,
            user: None,
            customer: None,
        }
    }

    /// Sets the delivery status.
    #[must_use]
    pub const fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the read receipt.
    #[must_use]
    pub const fn with_read_at(mut self, read_at: Option<DateTime<Utc>>) -> Self {
        self.read_at = read_at;
        self
    }

    /// Embeds the customer, used for alert labels.
    #[must_use]
    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Sent by the customer.
    #[must_use]
    pub const fn is_inbound(&self) -> bool {
        matches!(self.direction, MessageDirection::Inbound)
    }

    /// Server-side unread: inbound and not yet acknowledged.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        unread::is_server_unread(self)
    }

    /// Label of whoever sent the message, as shown in alerts.
    #[must_use]
    pub fn sender_label(&self) -> &str {
        self.customer
            .as_ref()
            .map(|c| c.name.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Customer")
    }

    /// First `max_chars` characters of the content.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }
}
