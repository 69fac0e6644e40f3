use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres};

use crate::common::UserId;
use crate::domains::matching::FilterCriteria;

/// A user's standing request to be paired with a partner.
///
/// The `search_queue` primary key on `user_id` is what enforces the
/// at-most-one-live-entry invariant; the engine never checks it in
/// application code.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub mode: String, // 'random', 'filtered'
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub enqueued_at: DateTime<Utc>,
}

/// Search mode enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Random,
    Filtered,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Random => write!(f, "random"),
            SearchMode::Filtered => write!(f, "filtered"),
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(SearchMode::Random),
            "filtered" => Ok(SearchMode::Filtered),
            _ => Err(anyhow::anyhow!("Invalid search mode: {}", s)),
        }
    }
}

impl QueueEntry {
    /// The entry's search mode. Unknown strings fall back to random.
    pub fn search_mode(&self) -> SearchMode {
        self.mode.parse().unwrap_or(SearchMode::Random)
    }

    /// The entry's filter criteria, as declared at enqueue time.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            interests: self.interests.clone(),
            age_min: self.age_min,
            age_max: self.age_max,
        }
    }
}

// =============================================================================
// Queue queries
// =============================================================================

impl QueueEntry {
    /// Insert a live entry. Returns `None` when one already exists for
    /// this user (idempotent retry tolerance).
    pub async fn insert(
        user_id: UserId,
        mode: SearchMode,
        criteria: FilterCriteria,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO search_queue (user_id, mode, interests, age_min, age_max)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(mode.to_string())
        .bind(&criteria.interests)
        .bind(criteria.age_min)
        .bind(criteria.age_max)
        .fetch_optional(pool)
        .await?;
        Ok(entry)
    }

    /// Find the live entry for a user, if any.
    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, Self>("SELECT * FROM search_queue WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(entry)
    }

    /// Whether the user currently has a live entry.
    pub async fn exists(user_id: UserId, pool: &PgPool) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM search_queue WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    /// All waiting entries except the given user's own.
    pub async fn find_waiting_except(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let entries = sqlx::query_as::<_, Self>(
            "SELECT * FROM search_queue WHERE user_id <> $1 ORDER BY enqueued_at",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(entries)
    }

    /// User IDs of everyone currently waiting (for the periodic match tick).
    pub async fn waiting_user_ids(pool: &PgPool) -> Result<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM search_queue ORDER BY enqueued_at",
        )
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }

    /// Remove a live entry. Returns true if one was removed.
    pub async fn delete(user_id: UserId, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM search_queue WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically consume a live entry. Zero rows means the entry was
    /// already consumed or cancelled - the pairing race was lost.
    pub async fn consume<'e>(
        user_id: UserId,
        executor: impl sqlx::Executor<'e, Database = Postgres>,
    ) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, Self>(
            "DELETE FROM search_queue WHERE user_id = $1 RETURNING *",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(entry)
    }

    /// Delete entries older than the cutoff, returning the evicted owners.
    pub async fn purge_older_than(
        cutoff: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, UserId>(
            "DELETE FROM search_queue WHERE enqueued_at < $1 RETURNING user_id",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }
}
