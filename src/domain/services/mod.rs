//! Pure domain services.

pub mod unread;
