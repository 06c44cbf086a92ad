//! Desktop notifications through the platform notification server.

use notify_rust::Notification;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::ports::{DesktopNotification, NotificationPermission, NotificationPort};

const APP_NAME: &str = "Chatdesk";

/// Shows critical unread alerts with `notify-rust`.
///
/// There is no permission prompt on the desktop; the configured toggle decides
/// what a permission request resolves to. A notification whose tag matches the
/// last one shown is skipped, since it would only replace itself.
#[derive(Debug)]
pub struct DesktopNotificationService {
    enabled: bool,
    permission: Mutex<NotificationPermission>,
    last_tag: Mutex<Option<String>>,
}

impl DesktopNotificationService {
    /// Creates the service. A disabled one never shows anything.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            permission: Mutex::new(NotificationPermission::Default),
            last_tag: Mutex::new(None),
        }
    }

    fn deliver(notification: DesktopNotification) {
        let show = move || {
            if let Err(e) = Notification::new()
                .summary(&notification.title)
                .body(&notification.body)
                .appname(APP_NAME)
                .show()
            {
                warn!(error = %e, tag = %notification.tag, "Failed to show notification");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(show);
            }
            Err(_) => show(),
        }
    }
}

impl NotificationPort for DesktopNotificationService {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock()
    }

    fn request_permission(&self) -> NotificationPermission {
        let mut permission = self.permission.lock();
        if *permission == NotificationPermission::Default {
            *permission = if self.enabled {
                NotificationPermission::Granted
            } else {
                NotificationPermission::Denied
            };
            debug!(permission = ?*permission, "Notification permission resolved");
        }
        *permission
    }

    fn show(&self, notification: &DesktopNotification) {
        if !self.enabled {
            return;
        }

        {
            let mut last_tag = self.last_tag.lock();
            if last_tag.as_deref() == Some(notification.tag.as_str()) {
                debug!(tag = %notification.tag, "Notification already shown");
                return;
            }
            *last_tag = Some(notification.tag.clone());
        }

        Self::deliver(notification.clone());
    }
}
