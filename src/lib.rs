//! Chatdesk - unread tracking and live alerts for a WhatsApp customer desk.
//!
//! The crate keeps a local read marker per conversation, mirrors the
//! backend's authoritative unread messages, reconciles Socket.IO push events
//! into the conversation list and raises desktop alerts for unread messages
//! that still need an answer.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing services, use cases and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "chatdesk";
