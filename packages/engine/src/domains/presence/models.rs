use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{ChatId, UserId};

/// Advisory per-user presence: online flag, searching flag, last-seen
/// timestamp and a short-lived typing marker.
///
/// Presence is best-effort observability for the partner-info display.
/// It is never proof a user is gone and never gates message delivery.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub is_online: bool,
    pub is_searching: bool,
    pub last_seen: DateTime<Utc>,
    pub typing_in_chat_id: Option<ChatId>,
    pub typing_expires_at: Option<DateTime<Utc>>,
}

impl PresenceRecord {
    /// The chat the user is typing in, masking expired markers.
    ///
    /// Reads never depend on the background sweep having run.
    pub fn typing_in(&self, now: DateTime<Utc>) -> Option<ChatId> {
        match (self.typing_in_chat_id, self.typing_expires_at) {
            (Some(chat_id), Some(expires_at)) if expires_at > now => Some(chat_id),
            _ => None,
        }
    }
}

// =============================================================================
// Presence queries
// =============================================================================

impl PresenceRecord {
    /// Find the presence record for a user.
    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let record = sqlx::query_as::<_, Self>("SELECT * FROM user_status WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(record)
    }

    /// Set the online flag, refreshing `last_seen`.
    pub async fn set_online(user_id: UserId, is_online: bool, pool: &PgPool) -> Result<Self> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO user_status (user_id, is_online, last_seen)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET is_online = EXCLUDED.is_online, last_seen = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(is_online)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// Refresh `last_seen` while a session is open.
    pub async fn heartbeat(user_id: UserId, pool: &PgPool) -> Result<Self> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO user_status (user_id, is_online, last_seen)
            VALUES ($1, TRUE, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET is_online = TRUE, last_seen = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// Flip the searching flag (maintained by enqueue/cancel/pairing).
    pub async fn set_searching(user_id: UserId, is_searching: bool, pool: &PgPool) -> Result<Self> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO user_status (user_id, is_searching)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET is_searching = EXCLUDED.is_searching
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(is_searching)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// Mark the user typing in a chat until the TTL lapses.
    pub async fn set_typing(
        user_id: UserId,
        chat_id: ChatId,
        ttl: std::time::Duration,
        pool: &PgPool,
    ) -> Result<Self> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(2));
        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO user_status (user_id, typing_in_chat_id, typing_expires_at, last_seen)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET typing_in_chat_id = EXCLUDED.typing_in_chat_id,
                typing_expires_at = EXCLUDED.typing_expires_at,
                last_seen = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// Drop the typing marker explicitly (message sent, input cleared).
    pub async fn clear_typing(user_id: UserId, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_status
            SET typing_in_chat_id = NULL, typing_expires_at = NULL
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Clear every expired typing marker (background sweep housekeeping).
    pub async fn clear_expired_typing(pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_status
            SET typing_in_chat_id = NULL, typing_expires_at = NULL
            WHERE typing_expires_at IS NOT NULL AND typing_expires_at <= NOW()
            "#,
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(typing: Option<(ChatId, DateTime<Utc>)>) -> PresenceRecord {
        PresenceRecord {
            user_id: UserId::new(),
            is_online: true,
            is_searching: false,
            last_seen: Utc::now(),
            typing_in_chat_id: typing.map(|(chat_id, _)| chat_id),
            typing_expires_at: typing.map(|(_, expires)| expires),
        }
    }

    #[test]
    fn live_typing_marker_is_visible() {
        let chat_id = ChatId::new();
        let now = Utc::now();
        let presence = record(Some((chat_id, now + chrono::Duration::seconds(2))));
        assert_eq!(presence.typing_in(now), Some(chat_id));
    }

    #[test]
    fn expired_typing_marker_is_masked() {
        let now = Utc::now();
        let presence = record(Some((ChatId::new(), now - chrono::Duration::seconds(1))));
        assert_eq!(presence.typing_in(now), None);
    }

    #[test]
    fn absent_marker_is_none() {
        assert_eq!(record(None).typing_in(Utc::now()), None);
    }
}
