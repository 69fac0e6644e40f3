//! In-process pub/sub hub for engine events.
//!
//! Provides topic-keyed broadcast channels for pushing facts to external
//! subscribers (UI layers, notification shells). No persistence: a
//! subscriber that falls behind or reconnects must re-read the session
//! store, which is the documented recovery path.
//!
//! # Usage
//!
//! Producers (domain actions):
//!   hub.publish(EngineEvent::SessionEnded { chat_id, ended_by }).await;
//!
//! Consumers:
//!   let rx = hub.subscribe_chat(chat_id).await;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::events::{chat_topic, user_topic, EngineEvent};
use crate::common::{ChatId, UserId};

/// Topic-keyed pub/sub hub.
///
/// Thread-safe, cloneable. An event fans out to every topic it names
/// (see `EngineEvent::topics`); delivery is at-most-once per active
/// subscriber. Dropping the returned receiver is the unsubscribe.
#[derive(Clone)]
pub struct EventHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<EngineEvent>>>>,
    capacity: usize,
}

impl EventHub {
    /// Create a new hub with default capacity (256 events per topic).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new hub with the given per-topic channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish an event to every topic it concerns. No-op for topics
    /// without subscribers.
    pub async fn publish(&self, event: EngineEvent) {
        let channels = self.channels.read().await;
        for topic in event.topics() {
            if let Some(tx) = channels.get(&topic) {
                // Ignore send errors (no active receivers)
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Subscribe to all events scoped to one chat.
    pub async fn subscribe_chat(&self, chat_id: ChatId) -> broadcast::Receiver<EngineEvent> {
        self.subscribe_topic(&chat_topic(chat_id)).await
    }

    /// Subscribe to all events concerning one user.
    pub async fn subscribe_user(&self, user_id: UserId) -> broadcast::Receiver<EngineEvent> {
        self.subscribe_topic(&user_topic(user_id)).await
    }

    async fn subscribe_topic(&self, topic: &str) -> broadcast::Receiver<EngineEvent> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Remove topics with zero subscribers (housekeeping).
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
