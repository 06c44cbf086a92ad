//! Session-scoped escalation of unread inbound messages.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use super::unread_messages::UnreadSnapshot;
use crate::domain::entities::{Message, MessageId};
use crate::domain::ports::{DesktopNotification, NotificationPermission, NotificationPort};

/// Title of every unread message notification.
pub const ALERT_TITLE: &str = "New Unread Message";
const PREVIEW_CHARS: usize = 50;

#[derive(Default)]
struct AlertState {
    unread: Vec<Message>,
    handled: HashSet<MessageId>,
    seen: HashSet<MessageId>,
}

impl AlertState {
    fn critical(&self) -> impl Iterator<Item = &Message> {
        self.unread.iter().filter(|m| !self.handled.contains(&m.id))
    }
}

/// Tracks which server-unread messages the agent has not dismissed yet.
///
/// Dismissals live only for the session and never touch the backend or the
/// read markers.
pub struct CriticalAlertService {
    notifications: Option<Arc<dyn NotificationPort>>,
    state: Mutex<AlertState>,
}

impl CriticalAlertService {
    /// Creates the service. `None` disables desktop notifications.
    #[must_use]
    pub fn new(notifications: Option<Arc<dyn NotificationPort>>) -> Self {
        Self {
            notifications,
            state: Mutex::new(AlertState::default()),
        }
    }

    /// Takes in a fresh server snapshot.
    pub fn sync(&self, snapshot: &UnreadSnapshot) {
        let notification = {
            let mut state = self.state.lock();
            let current: HashSet<MessageId> =
                snapshot.unread_messages.iter().map(|m| m.id).collect();

            state.unread.clone_from(&snapshot.unread_messages);
            state.handled.retain(|id| current.contains(id));
            state.seen.retain(|id| current.contains(id));

            let fresh: Vec<MessageId> = state
                .critical()
                .map(|m| m.id)
                .filter(|id| !state.seen.contains(id))
                .collect();
            if fresh.is_empty() {
                None
            } else {
                state.seen.extend(fresh);
                state.critical().last().map(alert_for)
            }
        };

        if let Some(notification) = notification {
            self.notify(&notification);
        }
    }

    fn notify(&self, notification: &DesktopNotification) {
        let Some(port) = &self.notifications else {
            return;
        };

        let mut permission = port.permission();
        if permission == NotificationPermission::Default {
            permission = port.request_permission();
        }
        if permission != NotificationPermission::Granted {
            debug!(?permission, "Notification permission not granted");
            return;
        }

        info!(tag = %notification.tag, "Raising unread message notification");
        port.show(notification);
    }

    /// Unread messages not dismissed this session.
    #[must_use]
    pub fn critical_unread_messages(&self) -> Vec<Message> {
        self.state.lock().critical().cloned().collect()
    }

    /// Whether anything still needs attention.
    #[must_use]
    pub fn has_critical_unread(&self) -> bool {
        self.state.lock().critical().next().is_some()
    }

    /// Dismisses one message locally.
    pub fn mark_message_as_handled(&self, id: MessageId) {
        self.state.lock().handled.insert(id);
    }

    /// Dismisses every currently unread message.
    pub fn mark_all_as_handled(&self) {
        let mut state = self.state.lock();
        let ids: Vec<MessageId> = state.unread.iter().map(|m| m.id).collect();
        state.handled.extend(ids);
    }

    /// Feeds every snapshot published on `rx` into [`sync`](Self::sync).
    ///
    /// Returns when the sender side is dropped.
    pub async fn watch(&self, mut rx: watch::Receiver<UnreadSnapshot>) {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            self.sync(&snapshot);
            if rx.changed().await.is_err() {
                debug!("Unread feed closed, alert watcher exiting");
                break;
            }
        }
    }
}

fn alert_for(message: &Message) -> DesktopNotification {
    DesktopNotification {
        title: ALERT_TITLE.to_string(),
        body: format!(
            "{}: {}...",
            message.sender_label(),
            message.preview(PREVIEW_CHARS)
        ),
        tag: format!("unread-{}", message.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        ConversationId, Customer, CustomerId, MessageDirection, MessageStatus,
    };
    use crate::domain::ports::mocks::MockNotificationPort;

    fn inbound(id: u64) -> Message {
        Message::new(
            MessageId(id),
            ConversationId(7),
            CustomerId(3),
            MessageDirection::Inbound,
            "Hello, I need help with my order",
        )
        .with_status(MessageStatus::Delivered)
    }

    fn snapshot(ids: &[u64]) -> UnreadSnapshot {
        UnreadSnapshot {
            total_unread_count: ids.len() as u64,
            unread_messages: ids.iter().map(|id| inbound(*id)).collect(),
            ..UnreadSnapshot::default()
        }
    }

    fn ids(messages: &[Message]) -> Vec<u64> {
        messages.iter().map(|m| m.id.as_u64()).collect()
    }

    #[test]
    fn test_handled_message_hidden_until_pruned() {
        let alerts = CriticalAlertService::new(None);
        alerts.sync(&snapshot(&[41, 42]));

        alerts.mark_message_as_handled(MessageId(42));
        alerts.sync(&snapshot(&[41, 42]));
        assert_eq!(ids(&alerts.critical_unread_messages()), vec![41]);

        // 42 disappears from the server list, so its handled entry is dropped.
        alerts.sync(&snapshot(&[41]));
        alerts.sync(&snapshot(&[41, 42]));
        assert_eq!(ids(&alerts.critical_unread_messages()), vec![41, 42]);
    }

    #[test]
    fn test_mark_all_as_handled() {
        let alerts = CriticalAlertService::new(None);
        alerts.sync(&snapshot(&[1, 2, 3]));
        assert!(alerts.has_critical_unread());

        alerts.mark_all_as_handled();

        assert!(!alerts.has_critical_unread());
        assert!(alerts.critical_unread_messages().is_empty());
    }

    #[test]
    fn test_notifies_newest_critical_message_once() {
        let port = Arc::new(MockNotificationPort::granted());
        let alerts = CriticalAlertService::new(Some(port.clone()));

        alerts.sync(&snapshot(&[1, 2]));
        alerts.sync(&snapshot(&[1, 2]));

        let shown = port.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, ALERT_TITLE);
        assert_eq!(shown[0].tag, "unread-2");
        assert_eq!(shown[0].body, "Customer: Hello, I need help with my order...");

        alerts.sync(&snapshot(&[1, 2, 3]));
        assert_eq!(port.shown().len(), 2);
        assert_eq!(port.shown()[1].tag, "unread-3");
    }

    #[test]
    fn test_notification_uses_customer_name_and_truncates() {
        let port = Arc::new(MockNotificationPort::granted());
        let alerts = CriticalAlertService::new(Some(port.clone()));

        let mut message = inbound(9).with_customer(Customer::new(CustomerId(3), "+55", "Maria"));
        message.content = "x".repeat(80);
        alerts.sync(&UnreadSnapshot {
            unread_messages: vec![message],
            ..UnreadSnapshot::default()
        });

        let body = &port.shown()[0].body;
        assert_eq!(body, &format!("Maria: {}...", "x".repeat(50)));
    }

    #[test]
    fn test_requests_permission_when_undetermined() {
        let port = Arc::new(MockNotificationPort::denying());
        let alerts = CriticalAlertService::new(Some(port.clone()));

        alerts.sync(&snapshot(&[1]));

        assert_eq!(*port.requests.lock(), 1);
        assert!(port.shown().is_empty());
    }

    #[test]
    fn test_handled_messages_do_not_notify() {
        let port = Arc::new(MockNotificationPort::granted());
        let alerts = CriticalAlertService::new(Some(port.clone()));

        alerts.sync(&snapshot(&[1]));
        alerts.mark_all_as_handled();
        alerts.sync(&snapshot(&[1]));

        assert_eq!(port.shown().len(), 1);
    }

    #[tokio::test]
    async fn test_watch_follows_channel_until_closed() {
        let alerts = Arc::new(CriticalAlertService::new(None));
        let (tx, rx) = watch::channel(UnreadSnapshot::default());

        let watcher = {
            let alerts = alerts.clone();
            tokio::spawn(async move { alerts.watch(rx).await })
        };

        tx.send_replace(snapshot(&[5]));
        drop(tx);
        watcher.await.unwrap();

        assert_eq!(ids(&alerts.critical_unread_messages()), vec![5]);
    }
}
