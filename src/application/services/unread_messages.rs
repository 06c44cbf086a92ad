//! Server-synchronized unread state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::entities::{ConversationId, Message};
use crate::domain::ports::CrmDataPort;

/// Error shown when a refresh fails.
pub const FETCH_ERROR: &str = "Failed to fetch unread messages";

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest accepted polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Cached view of the backend's unread messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadSnapshot {
    /// Unread total as counted by the backend.
    pub total_unread_count: u64,
    /// Unread inbound messages, newest first.
    pub unread_messages: Vec<Message>,
    /// A refresh is in flight.
    pub loading: bool,
    /// Message of the last failed refresh, cleared by the next success.
    pub error: Option<String>,
}

struct Inner {
    crm: Arc<dyn CrmDataPort>,
    state: watch::Sender<UnreadSnapshot>,
    authenticated: AtomicBool,
    generation: AtomicU64,
    poll_interval: Duration,
}

/// Keeps an authoritative unread count and list, refreshed by polling.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct UnreadMessagesService {
    inner: Arc<Inner>,
}

impl UnreadMessagesService {
    /// Creates a logged-out service. Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    #[must_use]
    pub fn new(crm: Arc<dyn CrmDataPort>, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(UnreadSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                crm,
                state,
                authenticated: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            }),
        }
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UnreadSnapshot> {
        self.inner.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> UnreadSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Whether refreshes are allowed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.authenticated.load(Ordering::SeqCst)
    }

    /// Effective polling interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Flips the authentication gate.
    ///
    /// Turning it off clears cached state immediately and invalidates any
    /// refresh still in flight.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.inner.authenticated.store(authenticated, Ordering::SeqCst);
        if authenticated {
            return;
        }

        let generation = &self.inner.generation;
        self.inner.state.send_modify(|state| {
            generation.fetch_add(1, Ordering::SeqCst);
            *state = UnreadSnapshot::default();
        });
        debug!("Unread state reset after logout");
    }

    /// Fetches the unread count and list together and replaces the cache.
    ///
    /// Either both values are replaced or neither is; on failure the previous
    /// data stays available and `error` is set.
    pub async fn refresh(&self) {
        if !self.is_authenticated() {
            debug!("Skipping unread refresh while unauthenticated");
            return;
        }

        let current = &self.inner.generation;
        let generation = current.load(Ordering::SeqCst);
        self.inner.state.send_if_modified(|state| {
            let live = current.load(Ordering::SeqCst) == generation;
            if live {
                state.loading = true;
            }
            live
        });

        let crm = &self.inner.crm;
        let result = tokio::try_join!(
            crm.fetch_unread_count(None),
            crm.fetch_unread_messages(None)
        );

        let applied = self.inner.state.send_if_modified(|state| {
            if current.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.loading = false;
            match result {
                Ok((count, messages)) => {
                    state.total_unread_count = count;
                    state.unread_messages = messages;
                    state.error = None;
                }
                Err(ref e) => {
                    warn!(error = %e, "Failed to fetch unread messages");
                    state.error = Some(FETCH_ERROR.to_string());
                }
            }
            true
        });

        if !applied {
            debug!("Discarded unread refresh from a previous session");
        }
    }

    /// Refreshes now and then every poll interval until stopped or logged out.
    #[must_use = "polling stops when the handle is dropped"]
    pub fn start_polling(&self) -> PollingHandle {
        let service = self.clone();
        let interval = self.inner.poll_interval;
        info!(interval_secs = interval.as_secs(), "Starting unread polling");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !service.is_authenticated() {
                    debug!("Unread polling stopped after logout");
                    break;
                }
                service.refresh().await;
            }
        });

        PollingHandle { task }
    }

    /// Server-unread messages cached for one conversation.
    #[must_use]
    pub fn conversation_unread_messages(&self, conversation_id: ConversationId) -> Vec<Message> {
        self.inner
            .state
            .borrow()
            .unread_messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.is_unread())
            .cloned()
            .collect()
    }

    /// Number of server-unread messages cached for one conversation.
    #[must_use]
    pub fn conversation_unread_count(&self, conversation_id: ConversationId) -> usize {
        self.inner
            .state
            .borrow()
            .unread_messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.is_unread())
            .count()
    }
}

/// Owns the polling task. Dropping it stops polling.
#[derive(Debug)]
pub struct PollingHandle {
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Aborts the polling task.
    pub fn stop(self) {
        drop(self);
    }

    /// Whether the task ended, either stopped or after logout.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CustomerId, MessageDirection, MessageId, MessageStatus};
    use crate::domain::errors::ApiError;
    use crate::domain::ports::mocks::MockCrmDataPort;
    use std::sync::OnceLock;
    use std::sync::atomic::AtomicUsize;

    fn inbound(id: u64, conversation: u64) -> Message {
        Message::new(
            MessageId(id),
            ConversationId(conversation),
            CustomerId(1),
            MessageDirection::Inbound,
            "hello",
        )
        .with_status(MessageStatus::Delivered)
    }

    fn service_with(crm: MockCrmDataPort) -> UnreadMessagesService {
        UnreadMessagesService::new(Arc::new(crm), DEFAULT_POLL_INTERVAL)
    }

    #[tokio::test]
    async fn test_refresh_replaces_state() {
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(2));
        crm.expect_fetch_unread_messages()
            .returning(|_| Ok(vec![inbound(1, 7), inbound(2, 8)]));

        let service = service_with(crm);
        service.set_authenticated(true);
        service.refresh().await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot.total_unread_count, 2);
        assert_eq!(snapshot.unread_messages.len(), 2);
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_skipped_when_unauthenticated() {
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().never();
        crm.expect_fetch_unread_messages().never();

        let service = service_with(crm);
        service.refresh().await;

        assert_eq!(service.snapshot(), UnreadSnapshot::default());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(1));
        crm.expect_fetch_unread_messages().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![inbound(42, 7)])
            } else {
                Err(ApiError::network("connection reset"))
            }
        });

        let service = service_with(crm);
        service.set_authenticated(true);
        service.refresh().await;
        service.refresh().await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some(FETCH_ERROR));
        assert_eq!(snapshot.unread_messages.len(), 1);
        assert_eq!(snapshot.total_unread_count, 1);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_partial_failure_applies_nothing() {
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count()
            .returning(|_| Err(ApiError::network("timeout")));
        crm.expect_fetch_unread_messages()
            .returning(|_| Ok(vec![inbound(1, 7)]));

        let service = service_with(crm);
        service.set_authenticated(true);
        service.refresh().await;

        let snapshot = service.snapshot();
        assert!(snapshot.unread_messages.is_empty());
        assert_eq!(snapshot.error.as_deref(), Some(FETCH_ERROR));
    }

    #[tokio::test]
    async fn test_logout_resets_state() {
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(1));
        crm.expect_fetch_unread_messages()
            .returning(|_| Ok(vec![inbound(1, 7)]));

        let service = service_with(crm);
        service.set_authenticated(true);
        service.refresh().await;
        assert_eq!(service.snapshot().total_unread_count, 1);

        service.set_authenticated(false);

        assert_eq!(service.snapshot(), UnreadSnapshot::default());
    }

    #[tokio::test]
    async fn test_result_from_previous_session_is_discarded() {
        let slot: Arc<OnceLock<UnreadMessagesService>> = Arc::new(OnceLock::new());
        let logout = slot.clone();

        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(5));
        crm.expect_fetch_unread_messages().returning(move |_| {
            if let Some(service) = logout.get() {
                service.set_authenticated(false);
            }
            Ok(vec![inbound(1, 7)])
        });

        let service = service_with(crm);
        assert!(slot.set(service.clone()).is_ok());
        service.set_authenticated(true);

        service.refresh().await;

        assert_eq!(service.snapshot(), UnreadSnapshot::default());
    }

    #[tokio::test]
    async fn test_conversation_filters() {
        let read = inbound(3, 7)
            .with_status(MessageStatus::Read)
            .with_read_at(Some(chrono::Utc::now()));

        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(3));
        crm.expect_fetch_unread_messages()
            .returning(move |_| Ok(vec![inbound(1, 7), inbound(2, 8), read.clone()]));

        let service = service_with(crm);
        service.set_authenticated(true);
        service.refresh().await;

        assert_eq!(service.conversation_unread_count(ConversationId(7)), 1);
        assert_eq!(
            service.conversation_unread_messages(ConversationId(8))[0].id,
            MessageId(2)
        );
        assert_eq!(service.conversation_unread_count(ConversationId(9)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_refreshes_on_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(0));
        crm.expect_fetch_unread_messages().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let service = service_with(crm);
        service.set_authenticated(true);
        let handle = service.start_polling();

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        handle.stop();
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(0));
        crm.expect_fetch_unread_messages().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let service = UnreadMessagesService::new(Arc::new(crm), Duration::ZERO);
        assert_eq!(service.poll_interval(), MIN_POLL_INTERVAL);

        service.set_authenticated(true);
        let handle = service.start_polling();
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(!handle.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_ends_on_logout() {
        let mut crm = MockCrmDataPort::new();
        crm.expect_fetch_unread_count().returning(|_| Ok(0));
        crm.expect_fetch_unread_messages().returning(|_| Ok(Vec::new()));

        let service = service_with(crm);
        service.set_authenticated(true);
        let handle = service.start_polling();

        tokio::time::sleep(Duration::from_secs(1)).await;
        service.set_authenticated(false);
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(handle.is_finished());
    }
}
