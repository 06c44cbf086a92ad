//! Use case implementations.

mod login_use_case;
mod mark_conversation_read;
mod resolve_token_use_case;

pub use login_use_case::LoginUseCase;
pub use mark_conversation_read::{MarkConversationReadUseCase, MarkReadOutcome};
pub use resolve_token_use_case::{ResolveTokenUseCase, ResolvedToken};
