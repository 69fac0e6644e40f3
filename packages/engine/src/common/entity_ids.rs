//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the engine.
//!
//! # Example
//!
//! ```rust
//! use engine_core::common::{ChatId, UserId};
//!
//! // These are incompatible types - compiler prevents mixing them up
//! let user_id: UserId = UserId::new();
//! let chat_id: ChatId = ChatId::new();
//!
//! // This would be a compile error:
//! // let wrong: ChatId = user_id;
//! ```

// Re-export the core Id type and version marker
pub use super::id::{Id, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for users. Users are anonymous; the engine only ever sees
/// their opaque IDs.
pub struct User;

/// Marker type for chat sessions.
pub struct Chat;

/// Marker type for messages.
pub struct Message;

/// Marker type for abuse reports.
pub struct Report;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for users.
pub type UserId = Id<User>;

/// Typed ID for chat sessions.
pub type ChatId = Id<Chat>;

/// Typed ID for messages.
pub type MessageId = Id<Message>;

/// Typed ID for abuse reports.
pub type ReportId = Id<Report>;

/// The reserved support pseudo-user (all-zeros UUID).
///
/// Support sessions carry exactly one real participant; messages sent on
/// behalf of moderation use this sender. It is never a queue citizen.
pub fn support_user() -> UserId {
    UserId::nil()
}
