//! Lifecycle of one authenticated agent session.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::services::{
    ConversationSync, CriticalAlertService, DEFAULT_POLL_INTERVAL, PollingHandle,
    ReadStatusManager, UnreadMessagesService, UnreadSnapshot,
};
use crate::application::use_cases::{MarkConversationReadUseCase, MarkReadOutcome};
use crate::domain::entities::{AuthToken, ConversationId};
use crate::domain::errors::ApiError;
use crate::domain::ports::{
    CrmDataPort, MarkerRepository, NotificationPort, SocketEvent, SocketPort, ViewFilter,
};

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Period of the unread refresh.
    pub poll_interval: Duration,
    /// Conversation list loaded at start.
    pub view_filter: ViewFilter,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            view_filter: ViewFilter::All,
        }
    }
}

/// Adapters a session runs against.
pub struct SessionPorts {
    /// REST backend.
    pub crm: Arc<dyn CrmDataPort>,
    /// Live event transport.
    pub socket: Arc<dyn SocketPort>,
    /// Local read-marker store.
    pub markers: Arc<dyn MarkerRepository>,
    /// `None` disables desktop notifications.
    pub notifications: Option<Arc<dyn NotificationPort>>,
}

/// Wires the unread fetcher, alert surfacer and live reconciler to one token.
///
/// Background work starts in [`start`](Self::start) and is torn down by
/// [`shutdown`](Self::shutdown) or on drop.
pub struct Session {
    token: AuthToken,
    socket: Arc<dyn SocketPort>,
    read_status: Arc<ReadStatusManager>,
    unread: UnreadMessagesService,
    alerts: Arc<CriticalAlertService>,
    sync: ConversationSync,
    mark_read: MarkConversationReadUseCase,
    polling: Option<PollingHandle>,
    alert_task: Option<JoinHandle<()>>,
}

impl Session {
    /// Builds an idle session. Nothing runs until [`start`](Self::start).
    #[must_use]
    pub fn new(token: AuthToken, ports: SessionPorts, settings: SessionSettings) -> Self {
        let read_status = Arc::new(ReadStatusManager::new(ports.markers));
        let unread = UnreadMessagesService::new(ports.crm.clone(), settings.poll_interval);
        let sync = ConversationSync::new(
            ports.crm.clone(),
            ports.socket.clone(),
            read_status.clone(),
            settings.view_filter,
        );

        Self {
            token,
            socket: ports.socket,
            read_status,
            unread,
            alerts: Arc::new(CriticalAlertService::new(ports.notifications)),
            sync,
            mark_read: MarkConversationReadUseCase::new(ports.crm),
            polling: None,
            alert_task: None,
        }
    }

    /// Whether background work was started and not shut down.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.polling.is_some()
    }

    /// Connects live updates, starts polling and loads the conversation list.
    ///
    /// # Errors
    /// Returns `ApiError` if the socket connection cannot be started.
    pub async fn start(&mut self) -> Result<(), ApiError> {
        if self.is_running() {
            return Ok(());
        }

        self.socket.connect(&self.token)?;
        self.unread.set_authenticated(true);
        self.polling = Some(self.unread.start_polling());

        let alerts = self.alerts.clone();
        let feed = self.unread.subscribe();
        self.alert_task = Some(tokio::spawn(async move { alerts.watch(feed).await }));

        self.sync.subscribe();
        self.sync.load_conversations().await;

        info!(
            conversations = self.sync.conversations().len(),
            "Session started"
        );
        Ok(())
    }

    /// Waits for and applies the next live event.
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.sync.next_event().await
    }

    /// Opens a conversation and marks its messages read on the backend.
    ///
    /// # Errors
    /// Returns `ApiError` if the conversation's messages cannot be loaded.
    pub async fn open_conversation(
        &mut self,
        id: ConversationId,
    ) -> Result<MarkReadOutcome, ApiError> {
        self.sync.select_conversation(id).await?;
        let outcome = self.mark_read.execute(id).await;
        if !outcome.marked.is_empty() {
            self.unread.refresh().await;
        }
        Ok(outcome)
    }

    /// Live reconciler state.
    #[must_use]
    pub const fn sync(&self) -> &ConversationSync {
        &self.sync
    }

    /// Mutable reconciler, for selection and sending.
    pub fn sync_mut(&mut self) -> &mut ConversationSync {
        &mut self.sync
    }

    /// Server-synchronized unread state.
    #[must_use]
    pub const fn unread(&self) -> &UnreadMessagesService {
        &self.unread
    }

    /// Critical alert state.
    #[must_use]
    pub fn alerts(&self) -> &CriticalAlertService {
        &self.alerts
    }

    /// Local read markers.
    #[must_use]
    pub fn read_status(&self) -> &ReadStatusManager {
        &self.read_status
    }

    /// Stops background work, drops cached unread state and disconnects.
    ///
    /// Alerts are emptied along with the unread cache so nothing from this
    /// session stays critical.
    pub fn shutdown(&mut self) {
        if let Some(polling) = self.polling.take() {
            polling.stop();
        }
        self.unread.set_authenticated(false);
        if let Some(task) = self.alert_task.take() {
            task.abort();
        }
        self.alerts.sync(&UnreadSnapshot::default());
        self.sync.teardown();
        self.socket.disconnect();
        debug!("Session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown();
        }
    }
}
