use sqlx::{FromRow, PgPool};

use crate::db::models::AssignedQuestion;
use crate::db::types::QuestionKind;

#[derive(Debug, FromRow)]
pub(crate) struct QuestionRef {
    pub(crate) question_id: String,
    pub(crate) kind: QuestionKind,
}

/// The exam's weighted question list, in display order.
pub(crate) async fn list_weighted_for_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<AssignedQuestion>, sqlx::Error> {
    sqlx::query_as::<_, AssignedQuestion>(
        "SELECT eq.question_id, q.kind, eq.weight
         FROM exam_questions eq
         JOIN questions q ON q.id = eq.question_id
         WHERE eq.exam_id = $1
         ORDER BY eq.position",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

/// Resolves a question only when it is assigned to the given exam.
pub(crate) async fn find_assigned(
    pool: &PgPool,
    exam_id: &str,
    question_id: &str,
) -> Result<Option<QuestionRef>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRef>(
        "SELECT eq.question_id, q.kind
         FROM exam_questions eq
         JOIN questions q ON q.id = eq.question_id
         WHERE eq.exam_id = $1 AND eq.question_id = $2",
    )
    .bind(exam_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn correct_option_ids(
    pool: &PgPool,
    question_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM question_options WHERE question_id = $1 AND is_correct ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_unanswered(
    pool: &PgPool,
    exam_id: &str,
    participation_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM exam_questions eq
         WHERE eq.exam_id = $1
           AND NOT EXISTS (
               SELECT 1 FROM answers a
               WHERE a.participation_id = $2 AND a.question_id = eq.question_id
           )",
    )
    .bind(exam_id)
    .bind(participation_id)
    .fetch_one(pool)
    .await
}
