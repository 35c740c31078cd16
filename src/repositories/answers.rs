use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Answer;
use crate::db::types::QuestionKind;

pub(crate) const COLUMNS: &str = "\
    id, participation_id, question_id, selected_option_ids, essay_text, \
    is_correct, manual_score, created_at, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) participation_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_option_ids: Vec<String>,
    pub(crate) essay_text: Option<&'a str>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) now: PrimitiveDateTime,
}

/// Per-question grading facts, keyed by question id in the service layer.
#[derive(Debug, FromRow)]
pub(crate) struct AnswerFactsRow {
    pub(crate) question_id: String,
    pub(crate) is_correct: Option<bool>,
    pub(crate) manual_score: Option<f64>,
}

#[derive(Debug, FromRow)]
pub(crate) struct AnswerWithKind {
    pub(crate) id: String,
    pub(crate) kind: QuestionKind,
}

pub(crate) async fn find_by_participation_and_question(
    pool: &PgPool,
    participation_id: &str,
    question_id: &str,
) -> Result<Option<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE participation_id = $1 AND question_id = $2"
    ))
    .bind(participation_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await
}

/// One row per (participation, question); resubmission overwrites in place.
/// Manual essay scores survive a resubmission only when the teacher re-grades,
/// so the upsert resets `manual_score`.
pub(crate) async fn upsert(
    pool: &PgPool,
    answer: UpsertAnswer<'_>,
) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "INSERT INTO answers (
            id, participation_id, question_id, selected_option_ids, essay_text,
            is_correct, manual_score, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $7)
        ON CONFLICT (participation_id, question_id) DO UPDATE
        SET selected_option_ids = EXCLUDED.selected_option_ids,
            essay_text = EXCLUDED.essay_text,
            is_correct = EXCLUDED.is_correct,
            manual_score = NULL,
            updated_at = EXCLUDED.updated_at
        RETURNING id",
    )
    .bind(answer.id)
    .bind(answer.participation_id)
    .bind(answer.question_id)
    .bind(Json(answer.selected_option_ids))
    .bind(answer.essay_text)
    .bind(answer.is_correct)
    .bind(answer.now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM answers WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

pub(crate) async fn list_facts_by_participation(
    pool: &PgPool,
    participation_id: &str,
) -> Result<Vec<AnswerFactsRow>, sqlx::Error> {
    sqlx::query_as::<_, AnswerFactsRow>(
        "SELECT question_id, is_correct, manual_score FROM answers WHERE participation_id = $1",
    )
    .bind(participation_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_with_kind(
    pool: &PgPool,
    answer_id: &str,
) -> Result<Option<AnswerWithKind>, sqlx::Error> {
    sqlx::query_as::<_, AnswerWithKind>(
        "SELECT a.id, q.kind
         FROM answers a
         JOIN questions q ON q.id = a.question_id
         WHERE a.id = $1",
    )
    .bind(answer_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn set_manual_score(
    pool: &PgPool,
    answer_id: &str,
    score: f64,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE answers SET manual_score = $1, updated_at = $2 WHERE id = $3")
        .bind(score)
        .bind(now)
        .bind(answer_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
