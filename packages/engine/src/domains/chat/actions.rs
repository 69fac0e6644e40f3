//! Chat session actions - message append, termination, read receipts.

use sqlx::PgPool;
use tracing::{debug, info};

use crate::common::{ChatId, EngineError, EngineResult, UserId};
use crate::domains::chat::models::{ChatSession, Message};
use crate::kernel::event_hub::EventHub;
use crate::kernel::events::EngineEvent;

/// Result of an end-session call that tolerates double termination.
#[derive(Debug, Clone)]
pub enum EndOutcome {
    /// This call performed the transition; `ended_by` records the caller.
    Ended(ChatSession),
    /// The session was already ended; `ended_by` is unchanged.
    AlreadyEnded(ChatSession),
}

impl EndOutcome {
    /// The session in its ended state, whoever got there first.
    pub fn session(&self) -> &ChatSession {
        match self {
            EndOutcome::Ended(session) | EndOutcome::AlreadyEnded(session) => session,
        }
    }
}

/// Append a message to a session's log.
///
/// The chat row lock serializes appends per session: the sequence number
/// is gapless and the timestamp non-decreasing. A concurrent end-session
/// resolves as last-accepted-write-wins - once the terminal flag is
/// visible, subsequent sends see `NotActive`.
pub async fn send_message(
    chat_id: ChatId,
    sender_id: UserId,
    body: String,
    preview_len: usize,
    pool: &PgPool,
    hub: &EventHub,
) -> EngineResult<Message> {
    let mut tx = pool.begin().await?;

    let session = ChatSession::lock_by_id(chat_id, &mut *tx)
        .await?
        .ok_or(EngineError::NotFound)?;

    if !session.is_active {
        return Err(EngineError::NotActive);
    }
    if !session.may_send(sender_id) {
        return Err(EngineError::NotParticipant);
    }

    let sequence_number = Message::next_sequence_number(chat_id, &mut *tx).await?;
    let message = Message::append(
        chat_id,
        sender_id,
        body,
        sequence_number,
        session.last_message_at,
        &mut *tx,
    )
    .await?;

    ChatSession::touch_last_message(
        chat_id,
        &preview(&message.body, preview_len),
        message.sent_at,
        &mut *tx,
    )
    .await?;

    tx.commit().await?;

    debug!(chat_id = %chat_id, sender_id = %sender_id, seq = sequence_number, "message appended");

    hub.publish(EngineEvent::MessageSent {
        chat_id,
        message_id: message.id,
        sender_id,
    })
    .await;

    Ok(message)
}

/// Terminate a session.
///
/// Idempotent: the first caller wins the `ended_by` slot, later calls get
/// `AlreadyEnded`. `SessionEnded` is published on the first transition
/// only.
pub async fn end_session(
    chat_id: ChatId,
    ended_by: UserId,
    pool: &PgPool,
    hub: &EventHub,
) -> EngineResult<EndOutcome> {
    if let Some(session) = ChatSession::mark_ended(chat_id, ended_by, pool).await? {
        info!(chat_id = %chat_id, ended_by = %ended_by, "session ended");
        hub.publish(EngineEvent::SessionEnded { chat_id, ended_by })
            .await;
        return Ok(EndOutcome::Ended(session));
    }

    match ChatSession::find_by_id(chat_id, pool).await? {
        Some(session) => Ok(EndOutcome::AlreadyEnded(session)),
        None => Err(EngineError::NotFound),
    }
}

/// Fetch a session.
pub async fn get_session(chat_id: ChatId, pool: &PgPool) -> EngineResult<ChatSession> {
    ChatSession::find_by_id(chat_id, pool)
        .await?
        .ok_or(EngineError::NotFound)
}

/// Mark every message the reader did not author as read by them.
pub async fn mark_read(chat_id: ChatId, reader_id: UserId, pool: &PgPool) -> EngineResult<u64> {
    // Verify the session exists so a bogus id surfaces as NotFound
    // rather than a silent zero-row update.
    get_session(chat_id, pool).await?;
    Ok(Message::mark_read(chat_id, reader_id, pool).await?)
}

/// The full message log for a session, in append order.
pub async fn messages(chat_id: ChatId, pool: &PgPool) -> EngineResult<Vec<Message>> {
    // A bogus id is NotFound, same as mark_read, not an empty log.
    get_session(chat_id, pool).await?;
    Ok(Message::find_by_chat(chat_id, pool).await?)
}

/// Truncate a message body for the session header preview.
fn preview(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}
