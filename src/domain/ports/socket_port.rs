//! Live socket port: push events from the backend and room membership commands.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use crate::domain::ConnectionStatus;
use crate::domain::entities::{
    AuthToken, Conversation, ConversationId, ConversationUpdate, Message,
};
use crate::domain::errors::ApiError;

/// Something pushed by the backend or raised by the connection itself.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Handshake completed, rooms rejoined.
    Connected,
    /// Connection lost or closed.
    Disconnected {
        /// Why the connection ended.
        reason: String,
    },
    /// A reconnect attempt is about to start.
    Reconnecting {
        /// One-based attempt number.
        attempt: u32,
    },
    /// `new_message` push.
    NewMessage {
        /// Pushed message.
        message: Message,
    },
    /// `new_conversation` push.
    NewConversation {
        /// Pushed conversation.
        conversation: Conversation,
    },
    /// `conversation_update` push.
    ConversationUpdate {
        /// Changed fields.
        update: ConversationUpdate,
    },
    /// Transport failure.
    Error {
        /// Error description.
        message: String,
        /// Whether a reconnect will follow.
        recoverable: bool,
    },
}

/// Coarse event category used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SocketEventKind {
    Connection,
    NewMessage,
    NewConversation,
    ConversationUpdate,
}

impl SocketEventKind {
    /// Every backend push, without connection events.
    pub const LIVE_UPDATES: [Self; 3] = [
        Self::NewMessage,
        Self::NewConversation,
        Self::ConversationUpdate,
    ];
}

impl SocketEvent {
    /// Wire name of the message push.
    pub const NEW_MESSAGE: &'static str = "new_message";
    /// Wire name of the conversation push.
    pub const NEW_CONVERSATION: &'static str = "new_conversation";
    /// Wire name of the conversation update push.
    pub const CONVERSATION_UPDATE: &'static str = "conversation_update";

    /// Category used to route the event to listeners.
    #[must_use]
    pub const fn kind(&self) -> SocketEventKind {
        match self {
            Self::NewMessage { .. } => SocketEventKind::NewMessage,
            Self::NewConversation { .. } => SocketEventKind::NewConversation,
            Self::ConversationUpdate { .. } => SocketEventKind::ConversationUpdate,
            Self::Connected
            | Self::Disconnected { .. }
            | Self::Reconnecting { .. }
            | Self::Error { .. } => SocketEventKind::Connection,
        }
    }
}

/// Commands the client emits to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketCommand {
    /// Receive pushes for a conversation's room.
    JoinConversation(ConversationId),
    /// Stop receiving them.
    LeaveConversation(ConversationId),
}

impl SocketCommand {
    /// Wire event name.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::JoinConversation(_) => "join_conversation",
            Self::LeaveConversation(_) => "leave_conversation",
        }
    }

    /// JSON argument sent with the event.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::JoinConversation(id) | Self::LeaveConversation(id) => {
                json!({ "conversationId": id })
            }
        }
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving end of a registered listener.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<SocketEvent>,
}

impl Subscription {
    /// Id to pass to [`SocketPort::off`].
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. Returns `None` once the listener was removed.
    pub async fn recv(&mut self) -> Option<SocketEvent> {
        self.rx.recv().await
    }

    /// Returns an already delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<SocketEvent> {
        self.rx.try_recv().ok()
    }
}

struct Listener {
    kinds: Vec<SocketEventKind>,
    tx: mpsc::UnboundedSender<SocketEvent>,
}

/// Fan-out table shared by socket implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<SubscriptionId, Listener>>,
}

impl ListenerRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener for the given kinds.
    pub fn register(&self, kinds: &[SocketEventKind]) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().insert(
            id,
            Listener {
                kinds: kinds.to_vec(),
                tx,
            },
        );
        Subscription { id, rx }
    }

    /// Removes a listener. Its subscription yields `None` after draining.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }

    /// Removes every listener, ending all subscriptions.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Delivers `event` to every listener interested in its kind.
    ///
    /// Listeners whose subscription was dropped are pruned.
    pub fn dispatch(&self, event: &SocketEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;

        self.listeners.lock().retain(|_, listener| {
            if !listener.kinds.contains(&kind) {
                return !listener.tx.is_closed();
            }
            if listener.tx.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });

        delivered
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Connection manager for the live event socket.
///
/// All methods take `&self`; implementations are shared behind an `Arc`.
pub trait SocketPort: Send + Sync {
    /// Opens the connection, authenticating with `token`. Does nothing when
    /// a connection is already running.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the connection cannot start.
    fn connect(&self, token: &AuthToken) -> Result<(), ApiError>;

    /// Closes the connection and removes every listener.
    fn disconnect(&self);

    /// Registers a listener for the given event kinds.
    fn on(&self, kinds: &[SocketEventKind]) -> Subscription;

    /// Removes a previously registered listener.
    fn off(&self, id: SubscriptionId);

    /// Sends a command. Queued while reconnecting, dropped with a warning
    /// when no connection is running.
    fn emit(&self, command: SocketCommand);

    /// Current connection state.
    fn status(&self) -> ConnectionStatus;
}
