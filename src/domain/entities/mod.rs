//! Domain entity definitions.

mod conversation;
mod customer;
mod message;
mod read_marker;
mod token;
mod user;

pub use conversation::{Conversation, ConversationId, ConversationStatus, ConversationUpdate};
pub use customer::{Customer, CustomerId};
pub use message::{Message, MessageDirection, MessageId, MessageStatus, MessageType};
pub use read_marker::{ReadMarker, ReadStatusData};
pub use token::AuthToken;
pub use user::{User, UserId, UserRole};
