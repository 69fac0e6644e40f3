//! Moderation domain - report intake and the human review state machine.

pub mod actions;
pub mod models;

pub use actions::{claim_report, reject_report, resolve_report, submit_report};
pub use models::{ReportRecord, ReportStatus};
