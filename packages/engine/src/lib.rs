//! Pairing and chat-session engine.
//!
//! Pairs anonymous users for one-on-one text conversations and manages
//! the conversation lifecycle: queuing for a partner, atomic pairing,
//! message exchange, presence signaling, termination, and abuse-report
//! intake. UI shells consume it through the [`Engine`] facade and the
//! event subscriptions it hands out.
//!
//! Coordination happens exclusively through atomic operations on the
//! backing store; the event hub is notification only. A subscriber that
//! misses events recovers by re-reading the store.

pub mod common;
pub mod config;
pub mod domains;
pub mod engine;
pub mod kernel;

pub use common::{ChatId, EngineError, EngineResult, MessageId, ReportId, UserId};
pub use config::EngineConfig;
pub use domains::chat::{ChatSession, EndOutcome, Message, SessionKind};
pub use domains::matching::{FilterCriteria, MatchOutcome};
pub use domains::moderation::{ReportRecord, ReportStatus};
pub use domains::presence::PresenceRecord;
pub use domains::queue::{EnqueueOutcome, QueueEntry, SearchMode};
pub use engine::Engine;
pub use kernel::{EngineEvent, EventHub, Sweeper};
