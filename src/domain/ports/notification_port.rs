/// Whether the desktop allows this process to raise notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum NotificationPermission {
    #[default]
    Default,
    Granted,
    Denied,
}

/// A system notification. Notifications sharing a `tag` replace each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    /// Summary line.
    pub title: String,
    /// Sender and message preview.
    pub body: String,
    /// Replacement key.
    pub tag: String,
}

/// Port for system notifications.
pub trait NotificationPort: Send + Sync {
    /// Current permission, without prompting.
    fn permission(&self) -> NotificationPermission;

    /// Asks for permission when it is still undecided and returns the outcome.
    fn request_permission(&self) -> NotificationPermission;

    /// Shows a notification. Implementations never fail loudly.
    fn show(&self, notification: &DesktopNotification);
}
