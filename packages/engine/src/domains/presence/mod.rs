//! Presence domain - advisory online/searching/typing state.

pub mod models;

pub use models::PresenceRecord;
