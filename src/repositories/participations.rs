use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Participation;
use crate::db::types::ParticipationStatus;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, status, started_at, finished_at, \
    is_blocked, block_reason, unlock_code, created_at, updated_at";

/// In-progress participation joined with the exam timing fields the
/// auto-finish reconciler needs to compute a deadline.
#[derive(Debug, FromRow)]
pub(crate) struct OverdueCandidate {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) exam_ends_at: Option<PrimitiveDateTime>,
    pub(crate) exam_title: String,
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Participation>, sqlx::Error> {
    sqlx::query_as::<_, Participation>(&format!(
        "SELECT {COLUMNS} FROM participations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_in_progress_with_exam(
    pool: &PgPool,
) -> Result<Vec<OverdueCandidate>, sqlx::Error> {
    sqlx::query_as::<_, OverdueCandidate>(
        "SELECT p.id,
                p.student_id,
                p.started_at,
                e.duration_minutes,
                e.ends_at AS exam_ends_at,
                e.title AS exam_title
         FROM participations p
         JOIN exams e ON e.id = p.exam_id
         WHERE p.status = $1 AND p.started_at IS NOT NULL
         ORDER BY p.started_at",
    )
    .bind(ParticipationStatus::InProgress)
    .fetch_all(pool)
    .await
}

/// `not_started -> in_progress`, setting the start time exactly once.
pub(crate) async fn mark_in_progress(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE participations SET status = $1, started_at = $2, updated_at = $2 \
         WHERE id = $3 AND status = $4",
    )
    .bind(ParticipationStatus::InProgress)
    .bind(now)
    .bind(id)
    .bind(ParticipationStatus::NotStarted)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// `in_progress -> submitted`, setting the end time exactly once. A zero row
/// count means a concurrent writer (student or reconciler) won the race.
pub(crate) async fn mark_submitted(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE participations SET status = $1, finished_at = $2, updated_at = $2 \
         WHERE id = $3 AND status = $4",
    )
    .bind(ParticipationStatus::Submitted)
    .bind(now)
    .bind(id)
    .bind(ParticipationStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn mark_graded(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE participations SET status = $1, updated_at = $2 \
         WHERE id = $3 AND status IN ($4, $1)",
    )
    .bind(ParticipationStatus::Graded)
    .bind(now)
    .bind(id)
    .bind(ParticipationStatus::Submitted)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn set_blocked(
    pool: &PgPool,
    id: &str,
    reason: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE participations SET is_blocked = TRUE, block_reason = $1, updated_at = $2 \
         WHERE id = $3",
    )
    .bind(reason)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn set_unlock_code(
    pool: &PgPool,
    id: &str,
    code: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE participations SET unlock_code = $1, updated_at = $2 WHERE id = $3")
        .bind(code)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn clear_block(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE participations \
         SET is_blocked = FALSE, block_reason = NULL, unlock_code = NULL, updated_at = $1 \
         WHERE id = $2",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn unlock_code_exists(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM participations WHERE unlock_code = $1")
            .bind(code)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}
