use anyhow::{Context, Result};
use serde_json::json;

use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::repositories;
use crate::services::activity::{self, ActivityKind};
use crate::services::error::SessionError;
use crate::services::sessions::{self, FinishTrigger};
use crate::services::session_timing;

/// One auto-finish tick: close every in-progress session whose deadline has
/// passed, through the same finish transition a student would take. Rows are
/// processed independently; a failure on one never aborts the batch.
pub async fn auto_finish_sessions(state: &AppState) -> Result<()> {
    let now = primitive_now_utc();
    let candidates = repositories::participations::list_in_progress_with_exam(state.db())
        .await
        .context("Failed to fetch in-progress sessions")?;

    let mut finished = 0u64;
    let mut already_closed = 0u64;
    let mut failed = 0u64;

    for candidate in candidates {
        if !session_timing::is_overdue(
            now,
            candidate.started_at,
            candidate.duration_minutes,
            candidate.exam_ends_at,
        ) {
            continue;
        }

        match sessions::finish_session(state, &candidate.id, FinishTrigger::Deadline).await {
            Ok(outcome) => {
                finished += 1;
                tracing::info!(
                    participation_id = %candidate.id,
                    student_id = %candidate.student_id,
                    exam = %candidate.exam_title,
                    score = outcome.score,
                    "Auto-finished overdue session"
                );
            }
            // The student finished concurrently; the row is no longer ours.
            Err(SessionError::SessionNotActive) => {
                already_closed += 1;
                tracing::debug!(
                    participation_id = %candidate.id,
                    "Session already closed by a concurrent finish"
                );
            }
            Err(err) => {
                failed += 1;
                tracing::error!(
                    participation_id = %candidate.id,
                    error = %err,
                    "Failed to auto-finish session"
                );
            }
        }
    }

    if finished > 0 || failed > 0 {
        tracing::info!(finished, already_closed, failed, "Auto-finish tick completed");
    }
    metrics::counter!("sessions_auto_finished_total").increment(finished);
    metrics::counter!("sessions_auto_finish_failed_total").increment(failed);

    Ok(())
}

/// One auto-expire tick: flip exams whose declared end has passed to `ended`,
/// regardless of how many of their participations have finished.
pub async fn auto_expire_exams(state: &AppState) -> Result<()> {
    let now = primitive_now_utc();
    let exams = repositories::exams::list_past_end(state.db(), now)
        .await
        .context("Failed to fetch exams past their end time")?;

    let mut expired = 0u64;
    let mut failed = 0u64;

    for exam in exams {
        match repositories::exams::mark_ended(state.db(), &exam.id, now).await {
            Ok(true) => {
                expired += 1;
                tracing::info!(exam_id = %exam.id, title = %exam.title, "Exam auto-expired");
                activity::record(
                    state,
                    ActivityKind::ExamAutoExpired,
                    Some(&exam.created_by),
                    None,
                    &format!("Exam \"{}\" automatically marked as ended", exam.title),
                    Some(json!({
                        "exam_id": exam.id,
                        "previous_status": exam.status,
                        "ends_at": exam.ends_at.map(format_primitive),
                        "expired_at": format_primitive(now),
                    })),
                )
                .await;
            }
            // Another writer already ended it.
            Ok(false) => {}
            Err(err) => {
                failed += 1;
                tracing::error!(exam_id = %exam.id, error = %err, "Failed to auto-expire exam");
            }
        }
    }

    if expired > 0 || failed > 0 {
        tracing::info!(expired, failed, "Auto-expire tick completed");
    }
    metrics::counter!("exams_auto_expired_total").increment(expired);
    metrics::counter!("exams_auto_expire_failed_total").increment(failed);

    Ok(())
}
