use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{ExamStatus, ParticipationStatus, QuestionKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) grade_label: String,
    pub(crate) starts_at: PrimitiveDateTime,
    pub(crate) ends_at: Option<PrimitiveDateTime>,
    pub(crate) duration_minutes: i32,
    pub(crate) shuffle_questions: bool,
    pub(crate) status: ExamStatus,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Participation {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: ParticipationStatus,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
    pub(crate) is_blocked: bool,
    pub(crate) block_reason: Option<String>,
    pub(crate) unlock_code: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One stored answer per (participation, question). Choice selections are kept
/// as a jsonb array of option ids regardless of question kind; essays leave it
/// empty and carry `essay_text` instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) participation_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_ids: Json<Vec<String>>,
    pub(crate) essay_text: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) manual_score: Option<f64>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResult {
    pub(crate) participation_id: String,
    pub(crate) final_score: f64,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AssignedQuestion {
    pub(crate) question_id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) weight: f64,
}
