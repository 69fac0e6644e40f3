use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::common::{ChatId, ReportId, UserId};

/// An abuse report tied to a session, reviewed by human moderators.
///
/// Reports outlive their session: one filed against a session that later
/// ends remains reviewable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReportRecord {
    pub id: ReportId,
    pub chat_id: ChatId,
    pub reporter_id: UserId,
    pub reason: String,
    pub status: String,
    pub assigned_to: Option<UserId>,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Report status enum
///
/// Lifecycle: `new → processing → {resolved, rejected}`, plus
/// `new → rejected`. `resolved` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    New,
    Processing,
    Resolved,
    Rejected,
}

impl ReportStatus {
    /// Whether the state machine permits this transition.
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::New, ReportStatus::Processing)
                | (ReportStatus::New, ReportStatus::Rejected)
                | (ReportStatus::Processing, ReportStatus::Resolved)
                | (ReportStatus::Processing, ReportStatus::Rejected)
        )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Rejected)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::New => write!(f, "new"),
            ReportStatus::Processing => write!(f, "processing"),
            ReportStatus::Resolved => write!(f, "resolved"),
            ReportStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(ReportStatus::New),
            "processing" => Ok(ReportStatus::Processing),
            "resolved" => Ok(ReportStatus::Resolved),
            "rejected" => Ok(ReportStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid report status: {}", s)),
        }
    }
}

impl ReportRecord {
    /// The report's parsed status. Unknown strings are treated as new.
    pub fn report_status(&self) -> ReportStatus {
        self.status.parse().unwrap_or(ReportStatus::New)
    }
}

// =============================================================================
// Report queries
// =============================================================================
//
// Transitions are guarded in the UPDATE's WHERE clause: a zero-row result
// means the report was not in the required state, and the caller maps
// that to InvalidTransition or NotFound.

impl ReportRecord {
    /// File a new report against a session.
    pub async fn create(
        chat_id: ChatId,
        reporter_id: UserId,
        reason: String,
        pool: &PgPool,
    ) -> Result<Self> {
        let report = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO reports (id, chat_id, reporter_id, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(ReportId::new())
        .bind(chat_id)
        .bind(reporter_id)
        .bind(reason)
        .fetch_one(pool)
        .await?;
        Ok(report)
    }

    /// Find report by ID.
    pub async fn find_by_id(id: ReportId, pool: &PgPool) -> Result<Option<Self>> {
        let report = sqlx::query_as::<_, Self>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(report)
    }

    /// Reports in a given state, oldest first (review queue order).
    pub async fn query_by_status(status: ReportStatus, pool: &PgPool) -> Result<Vec<Self>> {
        let reports = sqlx::query_as::<_, Self>(
            "SELECT * FROM reports WHERE status = $1 ORDER BY created_at",
        )
        .bind(status.to_string())
        .fetch_all(pool)
        .await?;
        Ok(reports)
    }

    /// Reports filed against one session.
    pub async fn query_for_chat(chat_id: ChatId, pool: &PgPool) -> Result<Vec<Self>> {
        let reports = sqlx::query_as::<_, Self>(
            "SELECT * FROM reports WHERE chat_id = $1 ORDER BY created_at DESC",
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;
        Ok(reports)
    }

    /// `new → processing`: an admin claims the report.
    pub async fn claim(id: ReportId, admin_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let report = sqlx::query_as::<_, Self>(
            r#"
            UPDATE reports
            SET status = 'processing', assigned_to = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'new'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    /// `processing → resolved` with the moderator's response.
    pub async fn resolve(
        id: ReportId,
        admin_id: UserId,
        response: String,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let report = sqlx::query_as::<_, Self>(
            r#"
            UPDATE reports
            SET status = 'resolved', assigned_to = $2, response = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .bind(response)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    /// `new|processing → rejected`: no response required.
    pub async fn reject(id: ReportId, admin_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let report = sqlx::query_as::<_, Self>(
            r#"
            UPDATE reports
            SET status = 'rejected', assigned_to = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('new', 'processing')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_id)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions_are_permitted() {
        assert!(ReportStatus::New.can_transition_to(ReportStatus::Processing));
        assert!(ReportStatus::New.can_transition_to(ReportStatus::Rejected));
        assert!(ReportStatus::Processing.can_transition_to(ReportStatus::Resolved));
        assert!(ReportStatus::Processing.can_transition_to(ReportStatus::Rejected));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for terminal in [ReportStatus::Resolved, ReportStatus::Rejected] {
            assert!(terminal.is_terminal());
            for next in [
                ReportStatus::New,
                ReportStatus::Processing,
                ReportStatus::Resolved,
                ReportStatus::Rejected,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn resolve_skipping_processing_is_forbidden() {
        assert!(!ReportStatus::New.can_transition_to(ReportStatus::Resolved));
    }

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [
            ReportStatus::New,
            ReportStatus::Processing,
            ReportStatus::Resolved,
            ReportStatus::Rejected,
        ] {
            let parsed: ReportStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
