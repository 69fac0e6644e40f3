//! Test fixtures for pairing and chat-session tests.

use engine_core::{
    ChatSession, Engine, FilterCriteria, MatchOutcome, SearchMode, UserId,
};

/// Enqueue a user in random mode with no criteria.
pub async fn enqueue_random(engine: &Engine, user_id: UserId) {
    engine
        .enqueue(user_id, SearchMode::Random, FilterCriteria::none())
        .await
        .expect("enqueue failed");
}

/// Pair two fresh users into a direct session.
pub async fn pair_users(engine: &Engine, user_a: UserId, user_b: UserId) -> ChatSession {
    enqueue_random(engine, user_a).await;
    enqueue_random(engine, user_b).await;

    match engine.try_match(user_a).await.expect("try_match failed") {
        MatchOutcome::Paired(session) => session,
        other => panic!("expected pairing, got {other:?}"),
    }
}
