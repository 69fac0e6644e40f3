//! Engine events - immutable facts published on the event hub.
//!
//! Events notify external subscribers (UI layers); they are never used for
//! coordination. Delivery is at-most-once per active subscriber: there is
//! no durable backlog, and a disconnected subscriber recovers by reading
//! the session store.

use serde::{Deserialize, Serialize};

use crate::common::{ChatId, MessageId, UserId};

/// Facts emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Two queue entries were converted into a session.
    Paired {
        chat_id: ChatId,
        participants: Vec<UserId>,
    },

    /// A message was appended to a session.
    MessageSent {
        chat_id: ChatId,
        message_id: MessageId,
        sender_id: UserId,
    },

    /// A session transitioned to its terminal ended state.
    SessionEnded { chat_id: ChatId, ended_by: UserId },

    /// Per-user notification that a new chat concerns them.
    NewChat {
        chat_id: ChatId,
        user_id: UserId,
        other_user_id: UserId,
    },

    /// A stale queue entry was purged; the owner should stop searching.
    SearchExpired { user_id: UserId },
}

impl EngineEvent {
    /// Topics this event is published to.
    ///
    /// Chat-scoped facts go to `chat:{id}`; facts concerning a specific
    /// user additionally go to `user:{id}`.
    pub fn topics(&self) -> Vec<String> {
        match self {
            EngineEvent::Paired {
                chat_id,
                participants,
            } => {
                let mut topics = vec![chat_topic(*chat_id)];
                topics.extend(participants.iter().map(|p| user_topic(*p)));
                topics
            }
            EngineEvent::MessageSent { chat_id, .. } => vec![chat_topic(*chat_id)],
            EngineEvent::SessionEnded { chat_id, .. } => vec![chat_topic(*chat_id)],
            EngineEvent::NewChat { user_id, .. } => vec![user_topic(*user_id)],
            EngineEvent::SearchExpired { user_id } => vec![user_topic(*user_id)],
        }
    }
}

/// Topic key for events scoped to one chat.
pub fn chat_topic(chat_id: ChatId) -> String {
    format!("chat:{chat_id}")
}

/// Topic key for events concerning one user.
pub fn user_topic(user_id: UserId) -> String {
    format!("user:{user_id}")
}
