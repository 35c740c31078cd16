use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::ExamStatus;

pub(crate) const COLUMNS: &str = "\
    id, title, subject, grade_label, starts_at, ends_at, duration_minutes, \
    shuffle_questions, status, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Exams whose declared end has passed but whose status has not caught up yet.
pub(crate) async fn list_past_end(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams \
         WHERE status IN ($1, $2) AND ends_at IS NOT NULL AND ends_at < $3 \
         ORDER BY ends_at"
    ))
    .bind(ExamStatus::Scheduled)
    .bind(ExamStatus::InProgress)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Status-guarded transition to `ended`. Returns false when another writer
/// already moved the exam out of the candidate statuses.
pub(crate) async fn mark_ended(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exams SET status = $1, updated_at = $2 WHERE id = $3 AND status IN ($4, $5)",
    )
    .bind(ExamStatus::Ended)
    .bind(now)
    .bind(id)
    .bind(ExamStatus::Scheduled)
    .bind(ExamStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
