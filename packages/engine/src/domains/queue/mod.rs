//! Search queue domain - standing pairing requests.

pub mod actions;
pub mod models;

pub use actions::{cancel, enqueue, is_queued, purge_stale, EnqueueOutcome};
pub use models::{QueueEntry, SearchMode};
