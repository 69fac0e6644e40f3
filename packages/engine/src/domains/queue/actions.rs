//! Search queue actions - enqueue, cancel, stale-entry purge.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::common::{EngineResult, UserId};
use crate::domains::matching::FilterCriteria;
use crate::domains::presence::models::PresenceRecord;
use crate::domains::queue::models::{QueueEntry, SearchMode};
use crate::kernel::event_hub::EventHub;
use crate::kernel::events::EngineEvent;

/// Result of an enqueue that tolerates client retries.
#[derive(Debug, Clone)]
pub enum EnqueueOutcome {
    /// A new live entry was created.
    Queued(QueueEntry),
    /// The user already had a live entry; nothing changed.
    AlreadyQueued,
}

impl EnqueueOutcome {
    /// Returns true if this call created the live entry.
    pub fn is_queued(&self) -> bool {
        matches!(self, EnqueueOutcome::Queued(_))
    }
}

/// Put a user into the search queue.
///
/// Idempotent: a second enqueue while a live entry exists is a benign
/// no-op, not an error. Also flips the presence searching flag for
/// observability.
pub async fn enqueue(
    user_id: UserId,
    mode: SearchMode,
    criteria: FilterCriteria,
    pool: &PgPool,
) -> EngineResult<EnqueueOutcome> {
    let inserted = QueueEntry::insert(user_id, mode, criteria, pool).await?;

    match inserted {
        Some(entry) => {
            info!(user_id = %user_id, mode = %mode, "user enqueued for pairing");
            PresenceRecord::set_searching(user_id, true, pool).await?;
            Ok(EnqueueOutcome::Queued(entry))
        }
        None => {
            debug!(user_id = %user_id, "enqueue was a no-op, entry already live");
            Ok(EnqueueOutcome::AlreadyQueued)
        }
    }
}

/// Remove a user's live entry.
///
/// No-op when absent - in particular when a concurrent pairing already
/// consumed the entry, in which case the caller should observe the
/// `Paired` event instead.
pub async fn cancel(user_id: UserId, pool: &PgPool) -> EngineResult<()> {
    let removed = QueueEntry::delete(user_id, pool).await?;
    if removed {
        info!(user_id = %user_id, "search cancelled");
    } else {
        debug!(user_id = %user_id, "cancel was a no-op, no live entry");
    }
    PresenceRecord::set_searching(user_id, false, pool).await?;
    Ok(())
}

/// Whether the user currently has a live entry.
pub async fn is_queued(user_id: UserId, pool: &PgPool) -> EngineResult<bool> {
    Ok(QueueEntry::exists(user_id, pool).await?)
}

/// Drop entries that waited longer than `max_wait` and tell their owners
/// to stop searching. Driven by the background sweeper, never by clients.
pub async fn purge_stale(
    max_wait: std::time::Duration,
    pool: &PgPool,
    hub: &EventHub,
) -> EngineResult<usize> {
    let cutoff = Utc::now()
        - chrono::Duration::from_std(max_wait).unwrap_or_else(|_| chrono::Duration::seconds(120));
    let evicted = QueueEntry::purge_older_than(cutoff, pool).await?;

    for user_id in &evicted {
        PresenceRecord::set_searching(*user_id, false, pool).await?;
        hub.publish(EngineEvent::SearchExpired { user_id: *user_id })
            .await;
    }

    if !evicted.is_empty() {
        info!(count = evicted.len(), "purged stale queue entries");
    }
    Ok(evicted.len())
}
