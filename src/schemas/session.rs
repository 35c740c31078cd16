use serde::Serialize;

use crate::db::types::ParticipationStatus;

#[derive(Debug, Serialize)]
pub struct SessionStarted {
    pub participation_id: String,
    pub status: ParticipationStatus,
    pub started_at: String,
    /// Hard deadline for this session, after which the auto-finish
    /// reconciler will close it.
    pub deadline: String,
    /// Assigned questions without a stored answer.
    pub remaining_questions: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionFinished {
    pub participation_id: String,
    pub score: f64,
    /// True while essay questions await a manual score; the stored score is
    /// provisional until grading is finalized.
    pub pending_essay_grading: bool,
    pub finished_at: String,
}
