//! Application services holding unread and live-update state.

mod conversation_sync;
mod critical_alerts;
mod read_status;
mod unread_messages;

pub use conversation_sync::ConversationSync;
pub use critical_alerts::{ALERT_TITLE, CriticalAlertService};
pub use read_status::ReadStatusManager;
pub use unread_messages::{
    DEFAULT_POLL_INTERVAL, FETCH_ERROR, MIN_POLL_INTERVAL, PollingHandle, UnreadMessagesService,
    UnreadSnapshot,
};
