//! Application layer with services, use cases and DTOs.

/// Data transfer objects.
pub mod dto;
/// Stateful unread and live-update services.
pub mod services;
/// Session lifecycle.
pub mod session;
/// Use case implementations.
pub mod use_cases;

pub use dto::{LoginRequest, LoginResponse, TokenSource};
pub use session::{Session, SessionPorts, SessionSettings};
pub use use_cases::{
    LoginUseCase, MarkConversationReadUseCase, MarkReadOutcome, ResolveTokenUseCase,
};
