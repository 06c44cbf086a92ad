//! Live reconciliation of conversations and messages.
//!
//! [`ConversationSync`] owns the conversation list, the open conversation and
//! its messages. Push events from the [`SocketPort`] are folded into that state
//! idempotently: delivery is at-least-once, so every append is deduplicated by
//! message id.
//!
//! Message counts per conversation feed the marker-based unread badges kept by
//! [`ReadStatusManager`]. Inbound pushes for background conversations only grow
//! the count; the read marker moves when the agent is looking at the
//! conversation or sends a message into it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::read_status::ReadStatusManager;
use crate::domain::entities::{
    Conversation, ConversationId, ConversationUpdate, Message, MessageId, UserId,
};
use crate::domain::errors::ApiError;
use crate::domain::ports::{
    CrmDataPort, SendMessageRequest, SocketCommand, SocketEvent, SocketEventKind, SocketPort,
    Subscription, ViewFilter,
};

const SUBSCRIBED_KINDS: [SocketEventKind; 4] = [
    SocketEventKind::Connection,
    SocketEventKind::NewMessage,
    SocketEventKind::NewConversation,
    SocketEventKind::ConversationUpdate,
];

/// Conversation list, open conversation and live listener of one session.
///
/// Message ids already applied are remembered per conversation, and only for
/// conversations that are still listed or open.
pub struct ConversationSync {
    crm: Arc<dyn CrmDataPort>,
    socket: Arc<dyn SocketPort>,
    read_status: Arc<ReadStatusManager>,
    view_filter: ViewFilter,
    conversations: Vec<Conversation>,
    selected: Option<ConversationId>,
    messages: Vec<Message>,
    message_counts: HashMap<ConversationId, u64>,
    seen_message_ids: HashMap<ConversationId, HashSet<MessageId>>,
    subscription: Option<Subscription>,
}

impl ConversationSync {
    /// Creates an idle sync with an empty list and no listener.
    #[must_use]
    pub fn new(
        crm: Arc<dyn CrmDataPort>,
        socket: Arc<dyn SocketPort>,
        read_status: Arc<ReadStatusManager>,
        view_filter: ViewFilter,
    ) -> Self {
        Self {
            crm,
            socket,
            read_status,
            view_filter,
            conversations: Vec::new(),
            selected: None,
            messages: Vec::new(),
            message_counts: HashMap::new(),
            seen_message_ids: HashMap::new(),
            subscription: None,
        }
    }

    /// Listed conversations, newest first as returned by the backend.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Id of the open conversation.
    #[must_use]
    pub const fn selected(&self) -> Option<ConversationId> {
        self.selected
    }

    /// Messages of the open conversation.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Filter used by the last list load.
    #[must_use]
    pub const fn view_filter(&self) -> ViewFilter {
        self.view_filter
    }

    /// Whether a live listener is registered.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Tracked message count, zero for conversations never seen.
    #[must_use]
    pub fn message_count(&self, conversation_id: ConversationId) -> u64 {
        self.message_counts
            .get(&conversation_id)
            .copied()
            .unwrap_or(0)
    }

    /// Marker-based unread flag for a conversation.
    #[must_use]
    pub fn is_unread(&self, conversation_id: ConversationId) -> bool {
        self.read_status
            .is_unread(conversation_id, self.message_count(conversation_id))
    }

    /// Messages received since the conversation was last read.
    #[must_use]
    pub fn unread_count(&self, conversation_id: ConversationId) -> u64 {
        self.read_status
            .get_unread_count(conversation_id, self.message_count(conversation_id))
    }

    /// Number of listed conversations with unread activity.
    #[must_use]
    pub fn total_unread_conversations(&self) -> usize {
        self.read_status.get_total_unread_count(
            self.conversations
                .iter()
                .map(|c| (c.id, self.message_count(c.id))),
        )
    }

    /// Registers the live listener, replacing any previous one.
    pub fn subscribe(&mut self) {
        self.unsubscribe();
        let subscription = self.socket.on(&SUBSCRIBED_KINDS);
        debug!(subscription = %subscription.id(), "Registered live update listener");
        self.subscription = Some(subscription);
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.socket.off(subscription.id());
            debug!(subscription = %subscription.id(), "Removed live update listener");
        }
    }

    fn resubscribe_if_active(&mut self) {
        if self.subscription.is_some() {
            self.subscribe();
        }
    }

    fn leave_selected(&mut self) {
        if let Some(id) = self.selected.take() {
            self.socket.emit(SocketCommand::LeaveConversation(id));
            debug!(conversation_id = %id, "Left conversation");
        }
        self.messages.clear();
    }

    fn seed_counts(&mut self, conversation: &Conversation) {
        let Some(embedded) = conversation.embedded_message_count() else {
            return;
        };
        let count = self.message_counts.entry(conversation.id).or_insert(0);
        *count = (*count).max(embedded);
        if let Some(messages) = &conversation.messages {
            self.seen_message_ids
                .entry(conversation.id)
                .or_default()
                .extend(messages.iter().map(|m| m.id));
        }
    }

    fn prune_seen_ids(&mut self) {
        let selected = self.selected;
        let conversations = &self.conversations;
        self.seen_message_ids.retain(|id, _| {
            Some(*id) == selected || conversations.iter().any(|c| c.id == *id)
        });
    }

    /// Reloads the conversation list for the current view filter.
    ///
    /// Failures are logged and the previous list is kept.
    pub async fn load_conversations(&mut self) {
        let result = match self.view_filter {
            ViewFilter::All => self.crm.fetch_conversations(None).await,
            ViewFilter::Mine => self.crm.fetch_my_conversations().await,
        };

        let conversations = match result {
            Ok(conversations) => conversations,
            Err(e) => {
                warn!(error = %e, filter = ?self.view_filter, "Failed to load conversations");
                return;
            }
        };

        for conversation in &conversations {
            self.seed_counts(conversation);
        }
        self.conversations = conversations;
        debug!(count = self.conversations.len(), "Loaded conversations");

        if let Some(selected) = self.selected {
            if !self.conversations.iter().any(|c| c.id == selected) {
                info!(conversation_id = %selected, "Open conversation no longer listed");
                self.close_conversation();
            }
        }
        self.prune_seen_ids();
    }

    /// Switches the list filter, closing the open conversation first.
    pub async fn set_view_filter(&mut self, filter: ViewFilter) {
        self.leave_selected();
        self.resubscribe_if_active();
        self.view_filter = filter;
        self.load_conversations().await;
    }

    /// Opens a conversation: joins its room, loads messages and marks it read.
    ///
    /// # Errors
    /// Returns `ApiError` if the messages cannot be loaded. The conversation
    /// stays selected and unread in that case.
    pub async fn select_conversation(&mut self, id: ConversationId) -> Result<(), ApiError> {
        self.leave_selected();
        self.subscribe();
        self.socket.emit(SocketCommand::JoinConversation(id));
        self.selected = Some(id);

        let messages = self.crm.fetch_messages(id).await.map_err(|e| {
            warn!(conversation_id = %id, error = %e, "Failed to load messages");
            e
        })?;

        let count = messages.len() as u64;
        self.seen_message_ids
            .insert(id, messages.iter().map(|m| m.id).collect());
        self.messages = messages;
        self.message_counts.insert(id, count);
        self.read_status.mark_as_read(id, count);

        info!(conversation_id = %id, message_count = count, "Opened conversation");
        Ok(())
    }

    /// Leaves the open conversation, keeping the live listener.
    pub fn close_conversation(&mut self) {
        self.leave_selected();
        self.resubscribe_if_active();
    }

    /// Waits for the next live event and applies it.
    ///
    /// Returns `None` when no listener is registered or it was removed.
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        let event = self.subscription.as_mut()?.recv().await?;
        self.apply_event(event.clone()).await;
        Some(event)
    }

    /// Folds one live event into the local state.
    pub async fn apply_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::NewMessage { message } => self.on_new_message(message).await,
            SocketEvent::NewConversation { conversation } => {
                self.on_new_conversation(conversation);
            }
            SocketEvent::ConversationUpdate { update } => self.on_conversation_update(&update),
            SocketEvent::Connected => info!("Live updates connected"),
            SocketEvent::Disconnected { reason } => warn!(%reason, "Live updates disconnected"),
            SocketEvent::Reconnecting { attempt } => {
                info!(attempt, "Reconnecting live updates");
            }
            SocketEvent::Error { message, recoverable } => {
                if recoverable {
                    warn!(%message, "Live update error");
                } else {
                    error!(%message, "Live updates failed");
                }
            }
        }
    }

    async fn on_new_message(&mut self, message: Message) {
        let conversation_id = message.conversation_id;

        if self.selected == Some(conversation_id) {
            if self.messages.iter().any(|m| m.id == message.id) {
                debug!(message_id = %message.id, "Ignoring duplicate message");
                return;
            }
            self.seen_ids(conversation_id).insert(message.id);
            self.messages.push(message);

            let count = self.messages.len() as u64;
            self.message_counts.insert(conversation_id, count);
            self.read_status.mark_as_read(conversation_id, count);
            self.load_conversations().await;
            return;
        }

        if !self.seen_ids(conversation_id).insert(message.id) {
            debug!(message_id = %message.id, "Ignoring duplicate message");
            return;
        }
        *self.message_counts.entry(conversation_id).or_insert(0) += 1;
        debug!(
            conversation_id = %conversation_id,
            count = self.message_count(conversation_id),
            "New message in background conversation"
        );
    }

    fn on_new_conversation(&mut self, conversation: Conversation) {
        if self.conversations.iter().any(|c| c.id == conversation.id) {
            debug!(conversation_id = %conversation.id, "Conversation already listed");
            return;
        }
        self.seed_counts(&conversation);
        info!(conversation_id = %conversation.id, "New conversation");
        self.conversations.insert(0, conversation);
    }

    fn on_conversation_update(&mut self, update: &ConversationUpdate) {
        match self
            .conversations
            .iter_mut()
            .find(|c| c.id == update.conversation_id)
        {
            Some(conversation) => conversation.apply_update(update),
            None => debug!(
                conversation_id = %update.conversation_id,
                "Update for unknown conversation"
            ),
        }
    }

    fn seen_ids(&mut self, conversation_id: ConversationId) -> &mut HashSet<MessageId> {
        self.seen_message_ids.entry(conversation_id).or_default()
    }

    fn append_own(&mut self, message: Message) {
        let conversation_id = message.conversation_id;
        if self.selected != Some(conversation_id) {
            return;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }

        self.seen_ids(conversation_id).insert(message.id);
        self.messages.push(message);
        let count = self.messages.len() as u64;
        self.message_counts.insert(conversation_id, count);
        self.read_status.update_message_count(conversation_id, count);
    }

    /// Sends a text message into the open conversation.
    ///
    /// Returns `Ok(None)` when nothing was sent (blank content or no open
    /// conversation).
    ///
    /// # Errors
    /// Returns `ApiError` if the backend rejects the message.
    pub async fn send_message(&mut self, content: &str) -> Result<Option<Message>, ApiError> {
        let content = content.trim();
        let Some(id) = self.selected else {
            return Ok(None);
        };
        if content.is_empty() {
            return Ok(None);
        }

        let request = match self.conversations.iter().find(|c| c.id == id) {
            Some(conversation) => SendMessageRequest::new(conversation, content),
            None => SendMessageRequest::new(&self.crm.fetch_conversation(id).await?, content),
        };

        let sent = self.crm.send_message(request).await.map_err(|e| {
            warn!(conversation_id = %id, error = %e, "Failed to send message");
            e
        })?;
        debug!(conversation_id = %id, message_id = %sent.id, "Message sent");

        self.append_own(sent.clone());
        Ok(Some(sent))
    }

    /// Records a message sent through another channel, such as a media upload.
    pub fn message_sent(&mut self, message: Message) {
        self.append_own(message);
    }

    /// Assigns a conversation to an agent and reloads the list.
    ///
    /// # Errors
    /// Returns `ApiError` if the assignment is rejected.
    pub async fn assign_conversation(
        &mut self,
        id: ConversationId,
        user_id: UserId,
    ) -> Result<(), ApiError> {
        self.crm.assign_conversation(id, user_id).await?;
        info!(conversation_id = %id, user_id = %user_id, "Conversation assigned");
        self.load_conversations().await;
        Ok(())
    }

    /// Leaves the open conversation and removes the live listener.
    pub fn teardown(&mut self) {
        self.leave_selected();
        self.unsubscribe();
        self.seen_message_ids.clear();
    }
}

impl Drop for ConversationSync {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ConversationStatus, Customer, CustomerId, MessageDirection};
    use crate::domain::ports::mocks::{FakeSocket, MockCrmDataPort};
    use crate::infrastructure::storage::InMemoryMarkerRepository;

    fn message(id: u64, conversation: u64) -> Message {
        Message::new(
            MessageId(id),
            ConversationId(conversation),
            CustomerId(conversation),
            MessageDirection::Inbound,
            "hi",
        )
    }

    fn conversation(id: u64) -> Conversation {
        Conversation::new(
            ConversationId(id),
            Customer::new(CustomerId(id), "+5511999", "Maria"),
        )
    }

    struct Fixture {
        socket: Arc<FakeSocket>,
        read_status: Arc<ReadStatusManager>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                socket: Arc::new(FakeSocket::new()),
                read_status: Arc::new(ReadStatusManager::new(Arc::new(
                    InMemoryMarkerRepository::new(),
                ))),
            }
        }

        fn sync(&self, crm: MockCrmDataPort) -> ConversationSync {
            ConversationSync::new(
                Arc::new(crm),
                self.socket.clone(),
                self.read_status.clone(),
                ViewFilter::All,
            )
        }
    }

    fn crm_with(conversations: Vec<Conversation>, messages: Vec<Message>) -> MockCrmDataPort {
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_conversations()
            .returning(move |_| Ok(conversations.clone()));
        crm.expect_fetch_messages()
            .returning(move |_| Ok(messages.clone()));
        crm
    }

    #[tokio::test]
    async fn test_open_conversation_stays_read_on_new_message() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(7)], vec![message(1, 7)]));
        sync.load_conversations().await;

        sync.select_conversation(ConversationId(7)).await.unwrap();
        assert!(!sync.is_unread(ConversationId(7)));

        fixture.socket.deliver(SocketEvent::NewMessage {
            message: message(2, 7),
        });
        sync.next_event().await.unwrap();

        assert_eq!(sync.messages().len(), 2);
        assert_eq!(sync.message_count(ConversationId(7)), 2);
        let marker = fixture.read_status.marker(ConversationId(7)).unwrap();
        assert_eq!(marker.message_count_at_read, 2);
        assert!(!sync.is_unread(ConversationId(7)));
    }

    #[tokio::test]
    async fn test_duplicate_new_message_is_applied_once() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(7)], vec![message(1, 7)]));
        sync.select_conversation(ConversationId(7)).await.unwrap();

        for _ in 0..2 {
            sync.apply_event(SocketEvent::NewMessage {
                message: message(2, 7),
            })
            .await;
        }
        assert_eq!(sync.messages().len(), 2);

        for _ in 0..2 {
            sync.apply_event(SocketEvent::NewMessage {
                message: message(10, 8),
            })
            .await;
        }
        assert_eq!(sync.message_count(ConversationId(8)), 1);
    }

    #[tokio::test]
    async fn test_background_message_grows_unread_without_touching_marker() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(8)], Vec::new()));
        fixture.read_status.mark_as_read(ConversationId(8), 0);

        sync.apply_event(SocketEvent::NewMessage {
            message: message(10, 8),
        })
        .await;

        assert!(sync.is_unread(ConversationId(8)));
        assert_eq!(sync.unread_count(ConversationId(8)), 1);
        let marker = fixture.read_status.marker(ConversationId(8)).unwrap();
        assert_eq!(marker.message_count_at_read, 0);
    }

    #[tokio::test]
    async fn test_load_seeds_counts_from_embedded_messages() {
        let fixture = Fixture::new();
        let mut listed = conversation(1);
        listed.messages = Some(vec![message(1, 1), message(2, 1), message(3, 1)]);
        let mut sync = fixture.sync(crm_with(vec![listed, conversation(2)], Vec::new()));
        fixture.read_status.mark_as_read(ConversationId(1), 3);

        sync.load_conversations().await;

        assert_eq!(sync.message_count(ConversationId(1)), 3);
        assert_eq!(sync.total_unread_conversations(), 0);
    }

    #[tokio::test]
    async fn test_selection_switch_leaves_and_joins() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(Vec::new(), Vec::new()));

        sync.select_conversation(ConversationId(1)).await.unwrap();
        sync.select_conversation(ConversationId(2)).await.unwrap();

        assert_eq!(
            fixture.socket.emitted(),
            vec![
                SocketCommand::JoinConversation(ConversationId(1)),
                SocketCommand::LeaveConversation(ConversationId(1)),
                SocketCommand::JoinConversation(ConversationId(2)),
            ]
        );
        assert_eq!(fixture.socket.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_new_conversation_prepended_once() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(1)], Vec::new()));
        sync.load_conversations().await;

        for _ in 0..2 {
            sync.apply_event(SocketEvent::NewConversation {
                conversation: conversation(2),
            })
            .await;
        }

        let ids: Vec<ConversationId> = sync.conversations().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ConversationId(2), ConversationId(1)]);
    }

    #[tokio::test]
    async fn test_conversation_update_merges_or_ignores() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(1)], Vec::new()));
        sync.load_conversations().await;

        sync.apply_event(SocketEvent::ConversationUpdate {
            update: ConversationUpdate::new(ConversationId(1))
                .with_status(ConversationStatus::Closed),
        })
        .await;
        sync.apply_event(SocketEvent::ConversationUpdate {
            update: ConversationUpdate::new(ConversationId(99))
                .with_status(ConversationStatus::Closed),
        })
        .await;

        assert_eq!(sync.conversations().len(), 1);
        assert_eq!(sync.conversations()[0].status, ConversationStatus::Closed);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_list() {
        let fixture = Fixture::new();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_conversations().returning(move |_| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                Ok(vec![conversation(1)])
            } else {
                Err(ApiError::network("offline"))
            }
        });
        let mut sync = fixture.sync(crm);

        sync.load_conversations().await;
        sync.load_conversations().await;

        assert_eq!(sync.conversations().len(), 1);
    }

    #[tokio::test]
    async fn test_view_filter_mine_uses_my_conversations() {
        let fixture = Fixture::new();
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_messages().returning(|_| Ok(Vec::new()));
        crm.expect_fetch_my_conversations()
            .times(1)
            .returning(|| Ok(vec![conversation(3)]));
        let mut sync = fixture.sync(crm);
        sync.select_conversation(ConversationId(5)).await.unwrap();

        sync.set_view_filter(ViewFilter::Mine).await;

        assert_eq!(sync.view_filter(), ViewFilter::Mine);
        assert!(sync.selected().is_none());
        assert!(sync.messages().is_empty());
        assert_eq!(sync.conversations()[0].id, ConversationId(3));
        assert!(
            fixture
                .socket
                .emitted()
                .contains(&SocketCommand::LeaveConversation(ConversationId(5)))
        );
    }

    #[tokio::test]
    async fn test_sent_message_does_not_count_as_unread() {
        let fixture = Fixture::new();
        let mut crm = crm_with(vec![conversation(7)], vec![message(1, 7)]);
        crm.expect_send_message().returning(|request| {
            let mut sent = message(50, request.conversation_id.as_u64());
            sent.direction = MessageDirection::Outbound;
            sent.content = request.content;
            Ok(sent)
        });
        let mut sync = fixture.sync(crm);
        sync.load_conversations().await;
        sync.select_conversation(ConversationId(7)).await.unwrap();

        let sent = sync.send_message("  on my way  ").await.unwrap().unwrap();

        assert_eq!(sent.content, "on my way");
        assert_eq!(sync.messages().len(), 2);
        assert!(!sync.is_unread(ConversationId(7)));

        // The socket echo of our own message is ignored.
        sync.apply_event(SocketEvent::NewMessage { message: sent }).await;
        assert_eq!(sync.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_message_is_not_sent() {
        let fixture = Fixture::new();
        let mut crm = crm_with(Vec::new(), Vec::new());
        crm.expect_send_message().never();
        let mut sync = fixture.sync(crm);
        sync.select_conversation(ConversationId(7)).await.unwrap();

        assert!(sync.send_message("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vanished_selection_is_closed() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(1)], Vec::new()));
        sync.select_conversation(ConversationId(9)).await.unwrap();

        sync.load_conversations().await;

        assert!(sync.selected().is_none());
    }

    #[tokio::test]
    async fn test_teardown_removes_listener() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(Vec::new(), Vec::new()));
        sync.select_conversation(ConversationId(4)).await.unwrap();
        assert_eq!(fixture.socket.listener_count(), 1);

        drop(sync);

        assert_eq!(fixture.socket.listener_count(), 0);
        assert_eq!(
            fixture.socket.emitted().last(),
            Some(&SocketCommand::LeaveConversation(ConversationId(4)))
        );
    }

    #[tokio::test]
    async fn test_seen_ids_follow_listed_conversations() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(8)], Vec::new()));

        for (id, conversation) in [(10, 8), (11, 9)] {
            sync.apply_event(SocketEvent::NewMessage {
                message: message(id, conversation),
            })
            .await;
        }
        assert_eq!(sync.seen_message_ids.len(), 2);

        sync.load_conversations().await;

        assert!(sync.seen_message_ids.contains_key(&ConversationId(8)));
        assert!(!sync.seen_message_ids.contains_key(&ConversationId(9)));

        sync.teardown();
        assert!(sync.seen_message_ids.is_empty());
    }

    #[tokio::test]
    async fn test_reopening_replaces_seen_ids() {
        let fixture = Fixture::new();
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_messages().returning(move |_| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                Ok(vec![message(1, 7), message(2, 7)])
            } else {
                Ok(vec![message(2, 7), message(3, 7)])
            }
        });
        let mut sync = fixture.sync(crm);

        sync.select_conversation(ConversationId(7)).await.unwrap();
        sync.close_conversation();
        sync.select_conversation(ConversationId(7)).await.unwrap();

        let seen = &sync.seen_message_ids[&ConversationId(7)];
        assert_eq!(seen.len(), 2);
        assert!(!seen.contains(&MessageId(1)));
    }

    #[tokio::test]
    async fn test_message_sent_elsewhere_is_recorded_for_open_conversation() {
        let fixture = Fixture::new();
        let mut sync = fixture.sync(crm_with(vec![conversation(7)], vec![message(1, 7)]));
        sync.select_conversation(ConversationId(7)).await.unwrap();
        assert!(sync.is_subscribed());

        let mut upload = message(60, 7);
        upload.direction = MessageDirection::Outbound;
        sync.message_sent(upload.clone());
        sync.message_sent(upload);
        sync.message_sent(message(61, 8));

        assert_eq!(sync.messages().len(), 2);
        assert!(!sync.is_unread(ConversationId(7)));
        assert_eq!(sync.message_count(ConversationId(8)), 0);

        sync.teardown();
        assert!(!sync.is_subscribed());
    }

    #[tokio::test]
    async fn test_assign_reloads_conversations() {
        let fixture = Fixture::new();
        let mut crm = crm_with(vec![conversation(1)], Vec::new());
        crm.expect_assign_conversation()
            .withf(|id, user| *id == ConversationId(1) && *user == UserId(2))
            .times(1)
            .returning(|_, _| Ok(conversation(1)));
        let mut sync = fixture.sync(crm);

        sync.assign_conversation(ConversationId(1), UserId(2)).await.unwrap();

        assert_eq!(sync.conversations().len(), 1);
    }
}
