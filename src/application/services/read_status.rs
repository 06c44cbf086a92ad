//! Read-marker bookkeeping.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::domain::entities::{ConversationId, ReadMarker, ReadStatusData};
use crate::domain::ports::MarkerRepository;
use crate::domain::services::unread;

/// Tracks which conversations the agent has read, backed by a [`MarkerRepository`].
///
/// Storage failures never reach callers: reads fall back to an empty store
/// (everything with messages looks unread) and writes are dropped.
pub struct ReadStatusManager {
    repository: Arc<dyn MarkerRepository>,
    write_lock: Mutex<()>,
}

impl ReadStatusManager {
    /// Creates a manager over the given store.
    #[must_use]
    pub fn new(repository: Arc<dyn MarkerRepository>) -> Self {
        Self {
            repository,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> ReadStatusData {
        self.repository.get().unwrap_or_else(|e| {
            error!(error = %e, "Failed to load read markers, treating store as empty");
            ReadStatusData::new()
        })
    }

    fn save(&self, data: &ReadStatusData) {
        if let Err(e) = self.repository.set(data) {
            error!(error = %e, "Failed to save read markers");
        }
    }

    /// Records that `conversation_id` was read with `message_count` messages.
    pub fn mark_as_read(&self, conversation_id: ConversationId, message_count: u64) {
        let _guard = self.write_lock.lock();
        let mut data = self.load();

        let count = data
            .get(conversation_id)
            .map_or(message_count, |m| m.message_count_at_read.max(message_count));
        data.insert(conversation_id, ReadMarker::now(count));
        self.save(&data);

        debug!(
            conversation_id = %conversation_id,
            message_count = count,
            "Marked conversation as read"
        );
    }

    /// Whether the conversation has messages past its marker.
    ///
    /// A conversation with no marker is unread as soon as it has any message.
    #[must_use]
    pub fn is_unread(&self, conversation_id: ConversationId, current_message_count: u64) -> bool {
        unread::is_unread(self.load().get(conversation_id), current_message_count)
    }

    /// Messages past the marker, or all of them when there is no marker.
    #[must_use]
    pub fn get_unread_count(
        &self,
        conversation_id: ConversationId,
        current_message_count: u64,
    ) -> u64 {
        unread::unread_count(self.load().get(conversation_id), current_message_count)
    }

    /// Number of conversations with messages past their marker.
    pub fn get_total_unread_count<I>(&self, conversations: I) -> usize
    where
        I: IntoIterator<Item = (ConversationId, u64)>,
    {
        let data = self.load();
        conversations
            .into_iter()
            .filter(|(id, count)| unread::is_unread(data.get(*id), *count))
            .count()
    }

    /// Raises an existing marker's baseline. Conversations never read stay untouched.
    pub fn update_message_count(&self, conversation_id: ConversationId, new_count: u64) {
        let _guard = self.write_lock.lock();
        let mut data = self.load();

        let Some(marker) = data.get_mut(conversation_id) else {
            return;
        };
        if new_count <= marker.message_count_at_read {
            return;
        }
        marker.raise_count(new_count);
        self.save(&data);
    }

    /// Forgets every marker, as on logout.
    pub fn clear_all(&self) {
        let _guard = self.write_lock.lock();
        match self.repository.clear() {
            Ok(()) => debug!("Cleared all read markers"),
            Err(e) => error!(error = %e, "Failed to clear read markers"),
        }
    }

    /// Stored marker for a conversation.
    #[must_use]
    pub fn marker(&self, conversation_id: ConversationId) -> Option<ReadMarker> {
        self.load().get(conversation_id).cloned()
    }
}
