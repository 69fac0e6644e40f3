//! The `Engine` facade - the full surface consumed by UI shells.
//!
//! One logical store, many concurrent callers: every operation here is an
//! atomic store operation (or a short transaction) plus, where relevant,
//! a fan-out on the event hub. Callers never coordinate through shared
//! memory, only through these operations.

use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::common::{ChatId, EngineResult, ReportId, UserId};
use crate::config::EngineConfig;
use crate::domains::chat::{self, ChatSession, EndOutcome, Message};
use crate::domains::matching::{self, FilterCriteria, MatchOutcome};
use crate::domains::moderation::{self, ReportRecord, ReportStatus};
use crate::domains::presence::PresenceRecord;
use crate::domains::queue::{self, EnqueueOutcome, SearchMode};
use crate::kernel::{EngineEvent, EventHub, Sweeper};

/// Handle to the pairing and chat-session engine.
///
/// Cheap to clone; all clones share the same pool and event hub.
#[derive(Clone)]
pub struct Engine {
    pool: PgPool,
    hub: EventHub,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine over an existing connection pool.
    pub fn new(pool: PgPool, config: EngineConfig) -> Self {
        let hub = EventHub::with_capacity(config.event_capacity);
        Self { pool, hub, config }
    }

    /// Connect to the database and apply migrations.
    pub async fn connect(database_url: &str, config: EngineConfig) -> EngineResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| sqlx::Error::from(e))?;
        Ok(Self::new(pool, config))
    }

    /// The underlying pool (fixtures, admin tooling).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Search queue
    // =========================================================================

    /// Put a user into the search queue. Idempotent under client retries.
    pub async fn enqueue(
        &self,
        user_id: UserId,
        mode: SearchMode,
        criteria: FilterCriteria,
    ) -> EngineResult<EnqueueOutcome> {
        queue::enqueue(user_id, mode, criteria, &self.pool).await
    }

    /// Remove a user's live entry; no-op if absent or already consumed.
    pub async fn cancel_search(&self, user_id: UserId) -> EngineResult<()> {
        queue::cancel(user_id, &self.pool).await
    }

    /// Whether the user currently has a live entry.
    pub async fn is_queued(&self, user_id: UserId) -> EngineResult<bool> {
        queue::is_queued(user_id, &self.pool).await
    }

    // =========================================================================
    // Matchmaking
    // =========================================================================

    /// Attempt to pair the user with a waiting partner right now.
    pub async fn try_match(&self, user_id: UserId) -> EngineResult<MatchOutcome> {
        matching::try_match(user_id, &self.pool, &self.hub, &self.config).await
    }

    // =========================================================================
    // Chat sessions
    // =========================================================================

    /// Fetch a session.
    pub async fn get_session(&self, chat_id: ChatId) -> EngineResult<ChatSession> {
        chat::get_session(chat_id, &self.pool).await
    }

    /// Active sessions the user participates in.
    pub async fn sessions_for(&self, user_id: UserId) -> EngineResult<Vec<ChatSession>> {
        Ok(ChatSession::find_active_for(user_id, &self.pool).await?)
    }

    /// Open a support session for one real participant.
    pub async fn create_support_session(&self, user_id: UserId) -> EngineResult<ChatSession> {
        Ok(ChatSession::create_support(user_id, &self.pool).await?)
    }

    /// Append a message to a session.
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        body: String,
    ) -> EngineResult<Message> {
        chat::send_message(
            chat_id,
            sender_id,
            body,
            self.config.preview_len,
            &self.pool,
            &self.hub,
        )
        .await
    }

    /// The session's message log, in append order.
    pub async fn messages(&self, chat_id: ChatId) -> EngineResult<Vec<Message>> {
        chat::messages(chat_id, &self.pool).await
    }

    /// Mark all messages not authored by the reader as read by them.
    pub async fn mark_read(&self, chat_id: ChatId, reader_id: UserId) -> EngineResult<u64> {
        chat::mark_read(chat_id, reader_id, &self.pool).await
    }

    /// Terminate a session. Idempotent.
    pub async fn end_session(&self, chat_id: ChatId, ended_by: UserId) -> EngineResult<EndOutcome> {
        chat::end_session(chat_id, ended_by, &self.pool, &self.hub).await
    }

    // =========================================================================
    // Presence
    // =========================================================================

    /// Set the online flag.
    pub async fn set_online(&self, user_id: UserId, is_online: bool) -> EngineResult<()> {
        PresenceRecord::set_online(user_id, is_online, &self.pool).await?;
        Ok(())
    }

    /// Refresh `last_seen` while a session is open.
    pub async fn heartbeat(&self, user_id: UserId) -> EngineResult<()> {
        PresenceRecord::heartbeat(user_id, &self.pool).await?;
        Ok(())
    }

    /// Mark the user typing in a chat; expires after the configured TTL.
    pub async fn set_typing(&self, user_id: UserId, chat_id: ChatId) -> EngineResult<()> {
        PresenceRecord::set_typing(user_id, chat_id, self.config.typing_ttl, &self.pool).await?;
        Ok(())
    }

    /// Drop the typing marker before its TTL (message sent, input cleared).
    pub async fn clear_typing(&self, user_id: UserId) -> EngineResult<()> {
        PresenceRecord::clear_typing(user_id, &self.pool).await?;
        Ok(())
    }

    /// The user's presence, with expired typing markers masked.
    pub async fn get_presence(&self, user_id: UserId) -> EngineResult<Option<PresenceRecord>> {
        Ok(PresenceRecord::find_by_user(user_id, &self.pool).await?)
    }

    // =========================================================================
    // Moderation
    // =========================================================================

    /// File a report against a session the reporter participates in.
    pub async fn submit_report(
        &self,
        chat_id: ChatId,
        reporter_id: UserId,
        reason: String,
    ) -> EngineResult<ReportRecord> {
        moderation::submit_report(chat_id, reporter_id, reason, &self.pool).await
    }

    /// An admin claims a new report for review.
    pub async fn claim_report(
        &self,
        report_id: ReportId,
        admin_id: UserId,
    ) -> EngineResult<ReportRecord> {
        moderation::claim_report(report_id, admin_id, &self.pool).await
    }

    /// Resolve a claimed report with a non-empty response.
    pub async fn resolve_report(
        &self,
        report_id: ReportId,
        admin_id: UserId,
        response: String,
    ) -> EngineResult<ReportRecord> {
        moderation::resolve_report(
            report_id,
            admin_id,
            response,
            self.config.preview_len,
            &self.pool,
            &self.hub,
        )
        .await
    }

    /// Reject a report from `new` or `processing`.
    pub async fn reject_report(
        &self,
        report_id: ReportId,
        admin_id: UserId,
    ) -> EngineResult<ReportRecord> {
        moderation::reject_report(report_id, admin_id, &self.pool).await
    }

    /// Reports in a given state, oldest first (the review queue).
    pub async fn reports_by_status(&self, status: ReportStatus) -> EngineResult<Vec<ReportRecord>> {
        Ok(ReportRecord::query_by_status(status, &self.pool).await?)
    }

    /// Reports filed against one session, newest first.
    pub async fn reports_for_chat(&self, chat_id: ChatId) -> EngineResult<Vec<ReportRecord>> {
        Ok(ReportRecord::query_for_chat(chat_id, &self.pool).await?)
    }

    // =========================================================================
    // Subscriptions & background services
    // =========================================================================

    /// Subscribe to events scoped to one chat. Drop the receiver to
    /// unsubscribe.
    pub async fn subscribe_chat(&self, chat_id: ChatId) -> broadcast::Receiver<EngineEvent> {
        self.hub.subscribe_chat(chat_id).await
    }

    /// Subscribe to events concerning one user.
    pub async fn subscribe_user(&self, user_id: UserId) -> broadcast::Receiver<EngineEvent> {
        self.hub.subscribe_user(user_id).await
    }

    /// Build the background sweeper for this engine. The caller spawns
    /// `run()` and keeps the shutdown handle.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(self.pool.clone(), self.hub.clone(), self.config.clone())
    }
}
