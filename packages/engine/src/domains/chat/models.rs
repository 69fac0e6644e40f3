use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres};

use crate::common::{ChatId, MessageId, UserId};

/// A conversation between exactly two participants, or one participant
/// and the support channel.
///
/// `is_active = false` is terminal: a session never reactivates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatSession {
    pub id: ChatId,
    pub kind: String, // 'direct', 'support'
    pub participants: Vec<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_by: Option<UserId>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Session kind enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Two real participants paired by the matchmaker.
    Direct,
    /// One real participant plus the reserved support pseudo-user.
    Support,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Direct => write!(f, "direct"),
            SessionKind::Support => write!(f, "support"),
        }
    }
}

impl std::str::FromStr for SessionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(SessionKind::Direct),
            "support" => Ok(SessionKind::Support),
            _ => Err(anyhow::anyhow!("Invalid session kind: {}", s)),
        }
    }
}

impl ChatSession {
    /// The session's kind. Unknown strings fall back to direct, the
    /// stricter authorization rule.
    pub fn session_kind(&self) -> SessionKind {
        self.kind.parse().unwrap_or(SessionKind::Direct)
    }

    /// Whether the user is a real participant of this session.
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    /// Authorization rule for appending messages.
    ///
    /// Direct sessions accept only their two participants; support
    /// sessions additionally accept the support pseudo-user.
    pub fn may_send(&self, sender_id: UserId) -> bool {
        match self.session_kind() {
            SessionKind::Direct => self.is_participant(sender_id),
            SessionKind::Support => sender_id.is_nil() || self.is_participant(sender_id),
        }
    }
}

/// A message in the append-only per-session log.
///
/// Immutable once appended, except for `read_by` additions. `sent_at` is
/// assigned under the chat row lock and never revised, so it is
/// non-decreasing in append order within a chat.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub body: String,
    pub sequence_number: i32,
    pub sent_at: DateTime<Utc>,
    pub read_by: Vec<UserId>,
}

impl Message {
    /// Whether the given user has read this message.
    pub fn is_read_by(&self, user_id: UserId) -> bool {
        self.read_by.contains(&user_id)
    }
}

// =============================================================================
// Session queries
// =============================================================================

impl ChatSession {
    /// Create a direct session between two paired users. Called only by
    /// the matchmaker, inside its pairing transaction.
    pub async fn create_direct<'e>(
        user_a: UserId,
        user_b: UserId,
        executor: impl sqlx::Executor<'e, Database = Postgres>,
    ) -> Result<Self> {
        let session = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO chats (id, kind, participants)
            VALUES ($1, 'direct', $2)
            RETURNING *
            "#,
        )
        .bind(ChatId::new())
        .bind(vec![user_a, user_b])
        .fetch_one(executor)
        .await?;
        Ok(session)
    }

    /// Create a support session for one real participant.
    pub async fn create_support(user_id: UserId, pool: &PgPool) -> Result<Self> {
        let session = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO chats (id, kind, participants)
            VALUES ($1, 'support', $2)
            RETURNING *
            "#,
        )
        .bind(ChatId::new())
        .bind(vec![user_id])
        .fetch_one(pool)
        .await?;
        Ok(session)
    }

    /// Find session by ID.
    pub async fn find_by_id(id: ChatId, pool: &PgPool) -> Result<Option<Self>> {
        let session = sqlx::query_as::<_, Self>("SELECT * FROM chats WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(session)
    }

    /// Lock the session row for the duration of the caller's transaction.
    pub async fn lock_by_id<'e>(
        id: ChatId,
        executor: impl sqlx::Executor<'e, Database = Postgres>,
    ) -> Result<Option<Self>> {
        let session = sqlx::query_as::<_, Self>("SELECT * FROM chats WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(session)
    }

    /// Mark the session ended. Zero rows means it was already ended (or
    /// never existed) - the guard makes termination idempotent.
    pub async fn mark_ended(id: ChatId, ended_by: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let session = sqlx::query_as::<_, Self>(
            r#"
            UPDATE chats
            SET is_active = FALSE, ended_at = NOW(), ended_by = $2
            WHERE id = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ended_by)
        .fetch_optional(pool)
        .await?;
        Ok(session)
    }

    /// Record the latest message on the session header.
    pub async fn touch_last_message<'e>(
        id: ChatId,
        preview: &str,
        at: DateTime<Utc>,
        executor: impl sqlx::Executor<'e, Database = Postgres>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE chats SET last_message_preview = $2, last_message_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(preview)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Active sessions a user participates in, newest activity first.
    pub async fn find_active_for(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let sessions = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM chats
            WHERE is_active AND participants @> ARRAY[$1]::uuid[]
            ORDER BY COALESCE(last_message_at, created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(sessions)
    }
}

// =============================================================================
// Message queries
// =============================================================================

impl Message {
    /// Append a message. Must run inside a transaction holding the chat
    /// row lock: the sequence number and the monotone timestamp both
    /// depend on it.
    pub async fn append<'e>(
        chat_id: ChatId,
        sender_id: UserId,
        body: String,
        sequence_number: i32,
        last_message_at: Option<DateTime<Utc>>,
        executor: impl sqlx::Executor<'e, Database = Postgres>,
    ) -> Result<Self> {
        let message = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, body, sequence_number, sent_at)
            VALUES ($1, $2, $3, $4, $5, GREATEST(NOW(), COALESCE($6, NOW())))
            RETURNING *
            "#,
        )
        .bind(MessageId::new())
        .bind(chat_id)
        .bind(sender_id)
        .bind(body)
        .bind(sequence_number)
        .bind(last_message_at)
        .fetch_one(executor)
        .await?;
        Ok(message)
    }

    /// Next sequence number for a chat. Call under the chat row lock.
    pub async fn next_sequence_number<'e>(
        chat_id: ChatId,
        executor: impl sqlx::Executor<'e, Database = Postgres>,
    ) -> Result<i32> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(sequence_number) FROM messages WHERE chat_id = $1",
        )
        .bind(chat_id)
        .fetch_one(executor)
        .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// The full log for a chat, in append order.
    pub async fn find_by_chat(chat_id: ChatId, pool: &PgPool) -> Result<Vec<Self>> {
        let messages = sqlx::query_as::<_, Self>(
            "SELECT * FROM messages WHERE chat_id = $1 ORDER BY sequence_number",
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    /// Add the reader to `read_by` of every message they did not author.
    pub async fn mark_read(chat_id: ChatId, reader_id: UserId, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read_by = array_append(read_by, $2)
            WHERE chat_id = $1
              AND sender_id <> $2
              AND NOT (read_by @> ARRAY[$2]::uuid[])
            "#,
        )
        .bind(chat_id)
        .bind(reader_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
