//! Bulk server-side mark-as-read for one conversation.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::domain::entities::{ConversationId, ConversationStatus, MessageId};
use crate::domain::ports::CrmDataPort;

/// Result of a bulk mark-as-read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkReadOutcome {
    /// Messages the backend acknowledged.
    pub marked: Vec<MessageId>,
    /// Messages whose request failed.
    pub failed: Vec<MessageId>,
    /// Status written back to the conversation, if the update went through.
    pub status: Option<ConversationStatus>,
}

impl MarkReadOutcome {
    /// Whether every request went through.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Marks every unread message of a conversation read on the backend.
///
/// Individual failures are skipped, and the conversation status is updated
/// afterwards from whatever remains unread.
pub struct MarkConversationReadUseCase {
    crm: Arc<dyn CrmDataPort>,
}

impl MarkConversationReadUseCase {
    /// Creates new use case.
    #[must_use]
    pub const fn new(crm: Arc<dyn CrmDataPort>) -> Self {
        Self { crm }
    }

    /// Marks the conversation's unread messages read, then recomputes its status.
    ///
    /// Falls back to the whole-conversation endpoint when the unread list
    /// cannot be fetched.
    pub async fn execute(&self, conversation_id: ConversationId) -> MarkReadOutcome {
        let mut outcome = MarkReadOutcome::default();

        match self.crm.fetch_unread_messages(Some(conversation_id)).await {
            Ok(messages) => {
                let ids: Vec<MessageId> = messages
                    .iter()
                    .filter(|m| m.is_unread())
                    .map(|m| m.id)
                    .collect();
                let requests = ids.iter().map(|id| self.crm.mark_message_read(*id));
                let results = join_all(requests).await;

                for (id, result) in ids.into_iter().zip(results) {
                    match result {
                        Ok(_) => outcome.marked.push(id),
                        Err(e) => {
                            warn!(message_id = %id, error = %e, "Failed to mark message read");
                            outcome.failed.push(id);
                        }
                    }
                }
            }
            Err(e) => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Failed to list unread messages, marking whole conversation"
                );
                match self.crm.mark_conversation_read(conversation_id).await {
                    Ok(read) => outcome.marked.extend(read.iter().map(|m| m.id)),
                    Err(e) => error!(
                        conversation_id = %conversation_id,
                        error = %e,
                        "Failed to mark conversation read"
                    ),
                }
            }
        }

        outcome.status = self.update_status(conversation_id).await;

        info!(
            conversation_id = %conversation_id,
            marked = outcome.marked.len(),
            failed = outcome.failed.len(),
            "Marked conversation read"
        );
        outcome
    }

    async fn update_status(&self, conversation_id: ConversationId) -> Option<ConversationStatus> {
        let remaining = match self.crm.fetch_unread_count(Some(conversation_id)).await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    conversation_id = %conversation_id,
                    error = %e,
                    "Failed to recount unread"
                );
                return None;
            }
        };

        let status = ConversationStatus::from_unread_count(remaining);
        match self
            .crm
            .update_conversation_status(conversation_id, status)
            .await
        {
            Ok(_) => {
                debug!(
                    conversation_id = %conversation_id,
                    %status,
                    "Conversation status updated"
                );
                Some(status)
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to update status");
                None
            }
        }
    }
}
