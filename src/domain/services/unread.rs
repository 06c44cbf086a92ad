//! Unread computation.
//!
//! Two independent notions of "unread" live here. Marker-based unread compares a
//! conversation's current message count with the count captured in its local
//! [`ReadMarker`]; it drives conversation-list badges and tolerates read receipts
//! lagging on the backend. Server-based unread looks at the delivery fields of a
//! single [`Message`]; it drives global counts and critical alerts. The two are
//! deliberately kept apart.
//!
//! Every function here is pure: identical inputs give identical outputs.

use crate::domain::entities::{Message, MessageStatus, ReadMarker};

/// Marker-based: does the conversation have messages past its marker?
///
/// Without a marker the conversation is unread as soon as it has any message.
#[must_use]
pub fn is_unread(marker: Option<&ReadMarker>, current_message_count: u64) -> bool {
    match marker {
        Some(marker) => current_message_count > marker.message_count_at_read,
        None => current_message_count > 0,
    }
}

/// Marker-based: how many messages arrived since the marker, never negative.
#[must_use]
pub fn unread_count(marker: Option<&ReadMarker>, current_message_count: u64) -> u64 {
    let baseline = marker.map_or(0, |m| m.message_count_at_read);
    current_message_count.saturating_sub(baseline)
}

/// Server-based: inbound and either not read or missing a read timestamp.
#[must_use]
pub fn is_server_unread(message: &Message) -> bool {
    message.is_inbound() && (message.status != MessageStatus::Read || message.read_at.is_none())
}
