//! Local read markers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConversationId;

/// Snapshot taken when the agent last read a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMarker {
    /// When the conversation was last explicitly read.
    pub last_read_at: DateTime<Utc>,
    /// Total message count at that moment. Never decreases.
    #[serde(rename = "messageCount")]
    pub message_count_at_read: u64,
}

impl ReadMarker {
    /// Creates a marker stamped with the current time.
    #[must_use]
    pub fn now(message_count: u64) -> Self {
        Self {
            last_read_at: Utc::now(),
            message_count_at_read: message_count,
        }
    }

    /// Raises the stored count without touching `last_read_at`.
    pub fn raise_count(&mut self, message_count: u64) {
        self.message_count_at_read = self.message_count_at_read.max(message_count);
    }
}

/// Every stored marker, keyed by conversation.
///
/// Serializes as a JSON object whose keys are conversation ids rendered as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadStatusData(BTreeMap<ConversationId, ReadMarker>);

impl ReadStatusData {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker for a conversation.
    #[must_use]
    pub fn get(&self, conversation_id: ConversationId) -> Option<&ReadMarker> {
        self.0.get(&conversation_id)
    }

    /// Mutable marker for a conversation.
    pub fn get_mut(&mut self, conversation_id: ConversationId) -> Option<&mut ReadMarker> {
        self.0.get_mut(&conversation_id)
    }

    /// Stores a marker, replacing any previous one.
    pub fn insert(&mut self, conversation_id: ConversationId, marker: ReadMarker) {
        self.0.insert(conversation_id, marker);
    }

    /// Number of conversations with a marker.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no marker is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
