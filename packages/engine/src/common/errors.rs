use thiserror::Error;

/// Error taxonomy for the pairing and chat-session engine.
///
/// `RaceLost` and `Storage` are retriable: the matchmaker retries with a
/// fresh read and report submission retries once before surfacing. The
/// remaining variants are terminal and returned to the caller immediately.
///
/// Benign idempotent outcomes (an entry already queued, a session already
/// ended) are not errors; see `EnqueueOutcome` and `EndOutcome`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Not found")]
    NotFound,

    #[error("Session is no longer active")]
    NotActive,

    #[error("Sender is not a participant of this session")]
    NotParticipant,

    #[error("Invalid report transition: {0}")]
    InvalidTransition(String),

    #[error("Resolving a report requires a non-empty response")]
    EmptyResponse,

    #[error("Lost a pairing race, retry with a fresh read")]
    RaceLost,

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// Whether the operation may succeed if simply retried.
    pub fn is_retriable(&self) -> bool {
        match self {
            EngineError::RaceLost => true,
            EngineError::Storage(err) => storage_retriable(err),
            // Storage errors crossing an anyhow boundary still count.
            EngineError::Internal(err) => err
                .downcast_ref::<sqlx::Error>()
                .is_some_and(storage_retriable),
            _ => false,
        }
    }
}

/// Serialization failures and deadlocks are treated like a lost race;
/// other database errors (constraint violations) are terminal. Anything
/// outside the database (pool, io) is worth one more attempt.
fn storage_retriable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => true,
    }
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
