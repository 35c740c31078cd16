use std::collections::HashMap;

use serde_json::json;
use time::PrimitiveDateTime;

use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Exam, Participation};
use crate::db::types::ParticipationStatus;
use crate::repositories;
use crate::schemas::session::{SessionFinished, SessionStarted};
use crate::services::activity::{self, ActivityKind};
use crate::services::error::SessionError;
use crate::services::grading::{self, AnswerFacts, ScoreBreakdown};
use crate::services::{session_timing, unlock_codes};

/// Who drove the finish transition. Both paths share one implementation; the
/// trigger only changes the recorded actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishTrigger {
    Manual,
    Deadline,
}

/// `not_started -> in_progress`. Refused outside the exam window and for
/// blocked participations unless a valid unlock code is supplied, in which
/// case the block is cleared as part of the start.
pub async fn start_session(
    state: &AppState,
    participation_id: &str,
    unlock_code: Option<&str>,
) -> Result<SessionStarted, SessionError> {
    let participation = repositories::participations::find_by_id(state.db(), participation_id)
        .await?
        .ok_or(SessionError::ParticipationNotFound)?;

    let exam = repositories::exams::find_by_id(state.db(), &participation.exam_id)
        .await?
        .ok_or(SessionError::ExamNotFound)?;

    let now = primitive_now_utc();
    let clears_block = check_start(&participation, &exam, now, unlock_code)?;

    // Optimistic guard: a concurrent start on the same row loses here.
    if !repositories::participations::mark_in_progress(state.db(), participation_id, now).await? {
        return Err(SessionError::AlreadyStarted);
    }

    if clears_block {
        repositories::participations::clear_block(state.db(), participation_id, now).await?;
    }

    let remaining = repositories::questions::count_unanswered(
        state.db(),
        &participation.exam_id,
        participation_id,
    )
    .await?;
    let deadline = session_timing::session_deadline(now, exam.duration_minutes, exam.ends_at);

    activity::record(
        state,
        ActivityKind::SessionStarted,
        Some(&participation.student_id),
        Some(participation_id),
        &format!("Session started for exam \"{}\"", exam.title),
        Some(json!({
            "exam_id": exam.id,
            "started_at": format_primitive(now),
            "deadline": format_primitive(deadline),
            "unlocked_with_code": clears_block,
        })),
    )
    .await;

    Ok(SessionStarted {
        participation_id: participation_id.to_string(),
        status: ParticipationStatus::InProgress,
        started_at: format_primitive(now),
        deadline: format_primitive(deadline),
        remaining_questions: remaining,
    })
}

/// `in_progress -> submitted` (and straight to `graded` for essay-free
/// exams): sets the end time, grades the current answer set and persists the
/// result. Invoked by the student and by the auto-finish reconciler alike.
pub async fn finish_session(
    state: &AppState,
    participation_id: &str,
    trigger: FinishTrigger,
) -> Result<SessionFinished, SessionError> {
    let participation = repositories::participations::find_by_id(state.db(), participation_id)
        .await?
        .ok_or(SessionError::ParticipationNotFound)?;

    if participation.status != ParticipationStatus::InProgress {
        return Err(SessionError::SessionNotActive);
    }

    let now = primitive_now_utc();
    // Re-check under the status guard: the student and the reconciler may
    // race, the loser sees zero rows and backs off.
    if !repositories::participations::mark_submitted(state.db(), participation_id, now).await? {
        return Err(SessionError::SessionNotActive);
    }

    let breakdown = grade_current_answers(state, &participation).await?;
    repositories::results::upsert(state.db(), participation_id, breakdown.score, now).await?;

    if !breakdown.has_essay {
        repositories::participations::mark_graded(state.db(), participation_id, now).await?;
    }

    let (kind, actor) = match trigger {
        FinishTrigger::Manual => {
            (ActivityKind::SessionFinished, Some(participation.student_id.as_str()))
        }
        FinishTrigger::Deadline => (ActivityKind::SessionAutoFinished, None),
    };
    activity::record(
        state,
        kind,
        actor,
        Some(participation_id),
        &match trigger {
            FinishTrigger::Manual => "Session finished by the student".to_string(),
            FinishTrigger::Deadline => "Session auto-finished after its deadline".to_string(),
        },
        Some(json!({
            "exam_id": participation.exam_id,
            "score": breakdown.score,
            "pending_essay_grading": breakdown.pending_essay_grading(),
            "finished_at": format_primitive(now),
        })),
    )
    .await;

    Ok(SessionFinished {
        participation_id: participation_id.to_string(),
        score: breakdown.score,
        pending_essay_grading: breakdown.pending_essay_grading(),
        finished_at: format_primitive(now),
    })
}

/// Explicit external finalization: recomputes the score from the current
/// answer set (picking up manual essay scores) and advances the
/// participation to `graded`. Never triggered automatically by a manual
/// score write.
pub async fn finalize_grading(
    state: &AppState,
    participation_id: &str,
) -> Result<SessionFinished, SessionError> {
    let participation = repositories::participations::find_by_id(state.db(), participation_id)
        .await?
        .ok_or(SessionError::ParticipationNotFound)?;

    if !matches!(
        participation.status,
        ParticipationStatus::Submitted | ParticipationStatus::Graded
    ) {
        return Err(SessionError::SessionNotActive);
    }

    let now = primitive_now_utc();
    let breakdown = grade_current_answers(state, &participation).await?;

    // Keep the original submission time stable across re-finalizations.
    let submitted_at =
        repositories::results::find_by_participation(state.db(), participation_id)
            .await?
            .map(|result| result.submitted_at)
            .or(participation.finished_at)
            .unwrap_or(now);

    repositories::results::upsert(state.db(), participation_id, breakdown.score, submitted_at)
        .await?;
    repositories::participations::mark_graded(state.db(), participation_id, now).await?;

    activity::record(
        state,
        ActivityKind::GradingFinalized,
        None,
        Some(participation_id),
        "Grading finalized",
        Some(json!({
            "exam_id": participation.exam_id,
            "score": breakdown.score,
            "pending_essay_grading": breakdown.pending_essay_grading(),
        })),
    )
    .await;

    Ok(SessionFinished {
        participation_id: participation_id.to_string(),
        score: breakdown.score,
        pending_essay_grading: breakdown.pending_essay_grading(),
        finished_at: format_primitive(submitted_at),
    })
}

async fn grade_current_answers(
    state: &AppState,
    participation: &Participation,
) -> Result<ScoreBreakdown, SessionError> {
    let questions =
        repositories::questions::list_weighted_for_exam(state.db(), &participation.exam_id).await?;
    let facts =
        repositories::answers::list_facts_by_participation(state.db(), &participation.id).await?;

    let answers: HashMap<String, AnswerFacts> = facts
        .into_iter()
        .map(|row| {
            (
                row.question_id,
                AnswerFacts { is_correct: row.is_correct, manual_score: row.manual_score },
            )
        })
        .collect();

    Ok(grading::compute_score(&questions, &answers))
}

/// Start guards, in order of precedence. Returns whether a valid unlock code
/// was supplied and the block fields must be cleared alongside the start.
fn check_start(
    participation: &Participation,
    exam: &Exam,
    now: PrimitiveDateTime,
    unlock_code: Option<&str>,
) -> Result<bool, SessionError> {
    match participation.status {
        ParticipationStatus::NotStarted => {}
        ParticipationStatus::InProgress => return Err(SessionError::AlreadyStarted),
        ParticipationStatus::Submitted | ParticipationStatus::Graded => {
            return Err(SessionError::AlreadyFinished)
        }
    }

    if now < exam.starts_at {
        return Err(SessionError::NotYetOpen);
    }
    if let Some(ends_at) = exam.ends_at {
        if now > ends_at {
            return Err(SessionError::WindowClosed);
        }
    }

    if !participation.is_blocked {
        return Ok(false);
    }

    match (unlock_code, participation.unlock_code.as_deref()) {
        (None, _) => Err(SessionError::Blocked),
        (Some(supplied), Some(stored)) if unlock_codes::codes_match(stored, supplied) => Ok(true),
        (Some(_), _) => Err(SessionError::InvalidUnlockCode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    use crate::db::types::ExamStatus;

    fn exam() -> Exam {
        Exam {
            id: "exam-1".to_string(),
            title: "Algebra midterm".to_string(),
            subject: "Math".to_string(),
            grade_label: "10".to_string(),
            starts_at: datetime!(2026-03-09 08:00),
            ends_at: Some(datetime!(2026-03-09 12:00)),
            duration_minutes: 90,
            shuffle_questions: false,
            status: ExamStatus::InProgress,
            created_by: "teacher-1".to_string(),
            created_at: datetime!(2026-03-01 00:00),
            updated_at: datetime!(2026-03-01 00:00),
        }
    }

    fn participation(status: ParticipationStatus) -> Participation {
        Participation {
            id: "part-1".to_string(),
            exam_id: "exam-1".to_string(),
            student_id: "student-1".to_string(),
            status,
            started_at: None,
            finished_at: None,
            is_blocked: false,
            block_reason: None,
            unlock_code: None,
            created_at: datetime!(2026-03-01 00:00),
            updated_at: datetime!(2026-03-01 00:00),
        }
    }

    fn blocked_participation(code: Option<&str>) -> Participation {
        let mut p = participation(ParticipationStatus::NotStarted);
        p.is_blocked = true;
        p.block_reason = Some("left the room".to_string());
        p.unlock_code = code.map(str::to_string);
        p
    }

    #[test]
    fn start_inside_window_is_allowed() {
        let result = check_start(
            &participation(ParticipationStatus::NotStarted),
            &exam(),
            datetime!(2026-03-09 09:00),
            None,
        );
        assert!(matches!(result, Ok(false)));
    }

    #[test]
    fn start_before_window_fails_not_yet_open() {
        let result = check_start(
            &participation(ParticipationStatus::NotStarted),
            &exam(),
            datetime!(2026-03-09 07:59),
            None,
        );
        assert!(matches!(result, Err(SessionError::NotYetOpen)));
    }

    #[test]
    fn start_after_window_fails_window_closed() {
        let result = check_start(
            &participation(ParticipationStatus::NotStarted),
            &exam(),
            datetime!(2026-03-09 12:01),
            None,
        );
        assert!(matches!(result, Err(SessionError::WindowClosed)));
    }

    #[test]
    fn exam_without_end_only_checks_the_opening() {
        let mut open_ended = exam();
        open_ended.ends_at = None;
        let result = check_start(
            &participation(ParticipationStatus::NotStarted),
            &open_ended,
            datetime!(2026-03-10 23:00),
            None,
        );
        assert!(matches!(result, Ok(false)));
    }

    #[test]
    fn restarting_an_in_progress_session_fails() {
        let result = check_start(
            &participation(ParticipationStatus::InProgress),
            &exam(),
            datetime!(2026-03-09 09:00),
            None,
        );
        assert!(matches!(result, Err(SessionError::AlreadyStarted)));
    }

    #[test]
    fn starting_a_finished_session_fails() {
        for status in [ParticipationStatus::Submitted, ParticipationStatus::Graded] {
            let result =
                check_start(&participation(status), &exam(), datetime!(2026-03-09 09:00), None);
            assert!(matches!(result, Err(SessionError::AlreadyFinished)));
        }
    }

    #[test]
    fn blocked_start_without_code_is_refused() {
        let result = check_start(
            &blocked_participation(Some("A1B2C3")),
            &exam(),
            datetime!(2026-03-09 09:00),
            None,
        );
        assert!(matches!(result, Err(SessionError::Blocked)));
    }

    #[test]
    fn blocked_start_with_wrong_code_is_refused() {
        let result = check_start(
            &blocked_participation(Some("A1B2C3")),
            &exam(),
            datetime!(2026-03-09 09:00),
            Some("XXXXXX"),
        );
        assert!(matches!(result, Err(SessionError::InvalidUnlockCode)));
    }

    #[test]
    fn blocked_start_with_matching_code_clears_the_block() {
        let result = check_start(
            &blocked_participation(Some("A1B2C3")),
            &exam(),
            datetime!(2026-03-09 09:00),
            Some("a1b2c3"),
        );
        assert!(matches!(result, Ok(true)));
    }

    #[test]
    fn blocked_start_with_code_but_none_issued_is_refused() {
        let result = check_start(
            &blocked_participation(None),
            &exam(),
            datetime!(2026-03-09 09:00),
            Some("A1B2C3"),
        );
        assert!(matches!(result, Err(SessionError::InvalidUnlockCode)));
    }

    #[test]
    fn window_guard_applies_before_the_block_guard() {
        let result = check_start(
            &blocked_participation(Some("A1B2C3")),
            &exam(),
            datetime!(2026-03-09 07:00),
            None,
        );
        assert!(matches!(result, Err(SessionError::NotYetOpen)));
    }
}
