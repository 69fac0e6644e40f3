//! Chat session domain - session records and the append-only message log.

pub mod actions;
pub mod models;

pub use actions::{end_session, get_session, mark_read, messages, send_message, EndOutcome};
pub use models::{ChatSession, Message, SessionKind};
