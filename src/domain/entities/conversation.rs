//! Conversation entity and partial live updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Customer, CustomerId, Message, User, UserId};

/// Unique identifier for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub u64);

impl ConversationId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConversationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Workflow state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ConversationStatus {
    #[default]
    Open,
    Closed,
    Pending,
}

impl ConversationStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Pending => "pending",
        }
    }

    /// Status a conversation should carry given its server unread count.
    #[must_use]
    pub const fn from_unread_count(count: u64) -> Self {
        if count > 0 { Self::Open } else { Self::Closed }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer thread as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation id.
    pub id: ConversationId,
    /// Customer the thread is with.
    pub customer_id: CustomerId,
    /// Agent handling the thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<UserId>,
    /// Workflow state.
    #[serde(default)]
    pub status: ConversationStatus,
    /// Time of the latest message.
    pub last_message_at: DateTime<Utc>,
    /// Embedded customer.
    pub customer: Customer,
    /// Embedded assigned agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<User>,
    /// Messages included by list endpoints that embed them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl Conversation {
    /// Creates an open conversation with no assignee.
    #[must_use]
    pub fn new(id: ConversationId, customer: Customer) -> Self {
        Self {
            id,
            customer_id: customer.id,
            assigned_user_id: None,
            status: ConversationStatus::Open,
            last_message_at: Utc::now(),
            customer,
            assigned_user: None,
            messages: None,
        }
    }

    /// Number of messages embedded in the payload, when the backend sent them.
    #[must_use]
    pub fn embedded_message_count(&self) -> Option<u64> {
        self.messages.as_ref().map(|m| m.len() as u64)
    }

    /// Overlays the fields carried by `update`. Ignores updates for other ids.
    pub fn apply_update(&mut self, update: &ConversationUpdate) {
        if update.conversation_id != self.id {
            return;
        }

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(user_id) = update.assigned_user_id {
            self.assigned_user_id = Some(user_id);
        }
        if let Some(user) = &update.assigned_user {
            self.assigned_user_id = Some(user.id);
            self.assigned_user = Some(user.clone());
        }
        if let Some(at) = update.last_message_at {
            self.last_message_at = at;
        }
        if let Some(customer) = &update.customer {
            self.customer_id = customer.id;
            self.customer = customer.clone();
        }
    }
}

/// Partial conversation fields pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdate {
    /// Also accepted as `id` when the backend pushes a whole conversation.
    #[serde(alias = "id")]
    pub conversation_id: ConversationId,
    /// New workflow state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
    /// New assignee id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_id: Option<UserId>,
    /// New assignee, embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<User>,
    /// New latest-message time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Refreshed customer record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
}

impl ConversationUpdate {
    /// An update that changes nothing yet.
    #[must_use]
    pub const fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            status: None,
            assigned_user_id: None,
            assigned_user: None,
            last_message_at: None,
            customer: None,
        }
    }

    /// Sets the new status.
    #[must_use]
    pub const fn with_status(mut self, status: ConversationStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation::new(
            ConversationId(7),
            Customer::new(CustomerId(3), "+5511999", "Maria"),
        )
    }

    #[test]
    fn test_apply_update_merges_present_fields_only() {
        let mut conv = conversation();
        let before = conv.last_message_at;

        let update = ConversationUpdate::new(ConversationId(7))
            .with_status(ConversationStatus::Pending);
        conv.apply_update(&update);

        assert_eq!(conv.status, ConversationStatus::Pending);
        assert_eq!(conv.last_message_at, before);
        assert_eq!(conv.customer.name, "Maria");
    }

    #[test]
    fn test_apply_update_ignores_other_conversation() {
        let mut conv = conversation();
        let update = ConversationUpdate::new(ConversationId(8))
            .with_status(ConversationStatus::Closed);
        conv.apply_update(&update);
        assert_eq!(conv.status, ConversationStatus::Open);
    }

    #[test]
    fn test_update_wire_format() {
        let json = r#"{"conversationId": 7, "status": "closed", "assignedUserId": 2}"#;
        let update: ConversationUpdate = serde_json::from_str(json).unwrap();

        assert_eq!(update.conversation_id, ConversationId(7));
        assert_eq!(update.status, Some(ConversationStatus::Closed));
        assert_eq!(update.assigned_user_id, Some(UserId(2)));
        assert!(update.customer.is_none());
    }

    #[test]
    fn test_full_conversation_payload_reads_as_update() {
        let json = r#"{"id": 7, "customerId": 3, "status": "pending"}"#;
        let update: ConversationUpdate = serde_json::from_str(json).unwrap();

        assert_eq!(update.conversation_id, ConversationId(7));
        assert_eq!(update.status, Some(ConversationStatus::Pending));
    }

    #[test]
    fn test_status_from_unread_count() {
        assert_eq!(
            ConversationStatus::from_unread_count(2),
            ConversationStatus::Open
        );
        assert_eq!(
            ConversationStatus::from_unread_count(0),
            ConversationStatus::Closed
        );
    }
}
