//! Moderation intake actions - report submission and the review state
//! machine driven by the external admin collaborator.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::common::{support_user, ChatId, EngineError, EngineResult, ReportId, UserId};
use crate::domains::chat;
use crate::domains::chat::models::{ChatSession, SessionKind};
use crate::domains::moderation::models::ReportRecord;
use crate::kernel::event_hub::EventHub;

/// File a report against a session the reporter participates in.
///
/// Allowed on active and ended sessions alike. Storage hiccups are
/// retried once before surfacing.
pub async fn submit_report(
    chat_id: ChatId,
    reporter_id: UserId,
    reason: String,
    pool: &PgPool,
) -> EngineResult<ReportRecord> {
    let session = ChatSession::find_by_id(chat_id, pool)
        .await?
        .ok_or(EngineError::NotFound)?;
    if !session.is_participant(reporter_id) {
        return Err(EngineError::NotParticipant);
    }

    match ReportRecord::create(chat_id, reporter_id, reason.clone(), pool).await {
        Ok(report) => {
            info!(report_id = %report.id, chat_id = %chat_id, "report submitted");
            Ok(report)
        }
        Err(first_err) => {
            warn!(chat_id = %chat_id, error = %first_err, "report insert failed, retrying once");
            let report = ReportRecord::create(chat_id, reporter_id, reason, pool).await?;
            info!(report_id = %report.id, chat_id = %chat_id, "report submitted on retry");
            Ok(report)
        }
    }
}

/// An admin claims a new report for review.
pub async fn claim_report(
    report_id: ReportId,
    admin_id: UserId,
    pool: &PgPool,
) -> EngineResult<ReportRecord> {
    match ReportRecord::claim(report_id, admin_id, pool).await? {
        Some(report) => {
            info!(report_id = %report_id, admin_id = %admin_id, "report claimed");
            Ok(report)
        }
        None => Err(transition_failure(report_id, "processing", pool).await?),
    }
}

/// Resolve a claimed report with a non-empty response.
///
/// When the report's session is a support channel, the response is also
/// appended to the session as a message from the support pseudo-user
/// (best-effort; an already-ended session skips the message).
pub async fn resolve_report(
    report_id: ReportId,
    admin_id: UserId,
    response: String,
    preview_len: usize,
    pool: &PgPool,
    hub: &EventHub,
) -> EngineResult<ReportRecord> {
    if response.trim().is_empty() {
        return Err(EngineError::EmptyResponse);
    }

    let report = match ReportRecord::resolve(report_id, admin_id, response.clone(), pool).await? {
        Some(report) => report,
        None => return Err(transition_failure(report_id, "resolved", pool).await?),
    };

    info!(report_id = %report_id, admin_id = %admin_id, "report resolved");

    if let Some(session) = ChatSession::find_by_id(report.chat_id, pool).await? {
        if session.session_kind() == SessionKind::Support {
            match chat::send_message(
                session.id,
                support_user(),
                response,
                preview_len,
                pool,
                hub,
            )
            .await
            {
                Ok(_) => {}
                Err(EngineError::NotActive) => {
                    // Session ended while the report was under review.
                    warn!(chat_id = %session.id, "support session already ended, response not relayed");
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(report)
}

/// Reject a report from `new` or `processing`.
pub async fn reject_report(
    report_id: ReportId,
    admin_id: UserId,
    pool: &PgPool,
) -> EngineResult<ReportRecord> {
    match ReportRecord::reject(report_id, admin_id, pool).await? {
        Some(report) => {
            info!(report_id = %report_id, admin_id = %admin_id, "report rejected");
            Ok(report)
        }
        None => Err(transition_failure(report_id, "rejected", pool).await?),
    }
}

/// Distinguish a missing report from one in the wrong state.
async fn transition_failure(
    report_id: ReportId,
    target: &str,
    pool: &PgPool,
) -> EngineResult<EngineError> {
    match ReportRecord::find_by_id(report_id, pool).await? {
        Some(report) => Ok(EngineError::InvalidTransition(format!(
            "cannot move report from '{}' to '{}'",
            report.status, target
        ))),
        None => Ok(EngineError::NotFound),
    }
}
