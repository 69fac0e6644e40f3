//! Matchmaker - converts two compatible queue entries into one session,
//! exactly once per pair, even under concurrent callers.
//!
//! A pairing attempt reads the live entries, picks a candidate uniformly
//! at random, then consumes both entries and creates the session inside a
//! single transaction. If either delete affects zero rows the race was
//! lost (a concurrent attempt or a cancel got there first): the
//! transaction rolls back and the attempt is retried with a fresh read.
//! Pairing failures are never fatal - the caller simply stays queued for
//! the next tick.

use rand::seq::SliceRandom;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::common::{EngineError, EngineResult, UserId};
use crate::config::EngineConfig;
use crate::domains::chat::models::ChatSession;
use crate::domains::presence::models::PresenceRecord;
use crate::domains::queue::models::{QueueEntry, SearchMode};
use crate::kernel::event_hub::EventHub;
use crate::kernel::events::EngineEvent;

/// Result of a pairing attempt.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    /// Both entries were consumed and a session created.
    Paired(ChatSession),
    /// No compatible partner is waiting; the caller remains queued.
    NoCandidate,
    /// The caller has no live entry - either never enqueued, cancelled,
    /// or already consumed by a concurrent pairing (observe `Paired`).
    NotQueued,
}

/// Attempt to pair the given user with a waiting partner.
///
/// Retries internally after lost races, up to `config.match_retries`
/// fresh reads. Exhausting the retries degrades to `NoCandidate`.
pub async fn try_match(
    user_id: UserId,
    pool: &PgPool,
    hub: &EventHub,
    config: &EngineConfig,
) -> EngineResult<MatchOutcome> {
    for attempt in 0..=config.match_retries {
        match attempt_pair(user_id, pool, hub).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) if err.is_retriable() => {
                debug!(user_id = %user_id, attempt, error = %err, "pairing race lost, retrying");
            }
            Err(err) => return Err(err),
        }
    }

    warn!(user_id = %user_id, "pairing retries exhausted, user stays queued");
    Ok(MatchOutcome::NoCandidate)
}

/// One pairing attempt: fresh read, uniform pick, atomic consume.
async fn attempt_pair(
    user_id: UserId,
    pool: &PgPool,
    hub: &EventHub,
) -> EngineResult<MatchOutcome> {
    let Some(own) = QueueEntry::find_by_user(user_id, pool).await? else {
        return Ok(MatchOutcome::NotQueued);
    };

    let waiting = QueueEntry::find_waiting_except(user_id, pool).await?;
    let Some(candidate) = pick_candidate(&own, &waiting) else {
        return Ok(MatchOutcome::NoCandidate);
    };
    let candidate_id = candidate.user_id;

    // Consume both entries and create the session atomically. A zero-row
    // delete means a concurrent pairing or cancel won; roll back and let
    // the caller retry with a fresh read.
    let mut tx = pool.begin().await?;

    if QueueEntry::consume(user_id, &mut *tx).await?.is_none() {
        return Err(EngineError::RaceLost);
    }
    if QueueEntry::consume(candidate_id, &mut *tx).await?.is_none() {
        return Err(EngineError::RaceLost);
    }

    let session = ChatSession::create_direct(user_id, candidate_id, &mut *tx).await?;
    tx.commit().await?;

    info!(
        chat_id = %session.id,
        user_a = %user_id,
        user_b = %candidate_id,
        "paired users into a new session"
    );

    // Post-commit bookkeeping: advisory flags and notifications only.
    PresenceRecord::set_searching(user_id, false, pool).await?;
    PresenceRecord::set_searching(candidate_id, false, pool).await?;

    hub.publish(EngineEvent::Paired {
        chat_id: session.id,
        participants: vec![user_id, candidate_id],
    })
    .await;
    hub.publish(EngineEvent::NewChat {
        chat_id: session.id,
        user_id,
        other_user_id: candidate_id,
    })
    .await;
    hub.publish(EngineEvent::NewChat {
        chat_id: session.id,
        user_id: candidate_id,
        other_user_id: user_id,
    })
    .await;

    Ok(MatchOutcome::Paired(session))
}

/// Pick a partner uniformly at random among the compatible candidates.
///
/// A filtered entry's declared criteria are honored from either side:
/// whenever the caller or the candidate searches in filtered mode, the
/// two sets of criteria must overlap. Two random entries always pair.
/// An empty overlap is "no match", never an error.
fn pick_candidate(own: &QueueEntry, waiting: &[QueueEntry]) -> Option<QueueEntry> {
    let own_criteria = own.criteria();
    let own_filtered = own.search_mode() == SearchMode::Filtered;

    let compatible: Vec<&QueueEntry> = waiting
        .iter()
        .filter(|entry| {
            let must_overlap = own_filtered || entry.search_mode() == SearchMode::Filtered;
            !must_overlap || own_criteria.overlaps(&entry.criteria())
        })
        .collect();

    let mut rng = rand::thread_rng();
    compatible.choose(&mut rng).map(|entry| (*entry).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::matching::FilterCriteria;
    use chrono::Utc;

    fn entry(mode: SearchMode, criteria: FilterCriteria) -> QueueEntry {
        QueueEntry {
            user_id: UserId::new(),
            mode: mode.to_string(),
            interests: criteria.interests,
            age_min: criteria.age_min,
            age_max: criteria.age_max,
            enqueued_at: Utc::now(),
        }
    }

    #[test]
    fn random_mode_picks_anyone() {
        let own = entry(SearchMode::Random, FilterCriteria::none());
        let other = entry(SearchMode::Random, FilterCriteria::interests(["chess"]));
        let picked = pick_candidate(&own, std::slice::from_ref(&other));
        assert_eq!(picked.unwrap().user_id, other.user_id);
    }

    #[test]
    fn empty_queue_yields_no_candidate() {
        let own = entry(SearchMode::Random, FilterCriteria::none());
        assert!(pick_candidate(&own, &[]).is_none());
    }

    #[test]
    fn filtered_mode_respects_overlap() {
        let own = entry(SearchMode::Filtered, FilterCriteria::interests(["music"]));
        let incompatible = entry(SearchMode::Filtered, FilterCriteria::interests(["chess"]));
        let compatible = entry(
            SearchMode::Filtered,
            FilterCriteria::interests(["music", "chess"]),
        );

        let waiting = vec![incompatible, compatible.clone()];
        let picked = pick_candidate(&own, &waiting);
        assert_eq!(picked.unwrap().user_id, compatible.user_id);
    }

    #[test]
    fn filtered_mode_with_no_overlap_yields_none() {
        let own = entry(SearchMode::Filtered, FilterCriteria::interests(["music"]));
        let waiting = vec![entry(
            SearchMode::Filtered,
            FilterCriteria::interests(["chess"]),
        )];
        assert!(pick_candidate(&own, &waiting).is_none());
    }

    #[test]
    fn random_caller_honors_filtered_waiter_criteria() {
        let own = entry(SearchMode::Random, FilterCriteria::interests(["music"]));
        let picky = entry(SearchMode::Filtered, FilterCriteria::interests(["chess"]));
        assert!(pick_candidate(&own, std::slice::from_ref(&picky)).is_none());

        let agreeable = entry(SearchMode::Filtered, FilterCriteria::interests(["music"]));
        let picked = pick_candidate(&own, std::slice::from_ref(&agreeable));
        assert_eq!(picked.unwrap().user_id, agreeable.user_id);
    }

    #[test]
    fn two_random_entries_always_pair() {
        let own = entry(SearchMode::Random, FilterCriteria::interests(["music"]));
        let other = entry(SearchMode::Random, FilterCriteria::interests(["chess"]));
        let picked = pick_candidate(&own, std::slice::from_ref(&other));
        assert_eq!(picked.unwrap().user_id, other.user_id);
    }
}
