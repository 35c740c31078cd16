use thiserror::Error;

/// Typed outcome of a session transition that was refused by a guard, plus
/// the infrastructure case. Guard violations are reported to the caller and
/// never retried; the reconcilers treat them as per-row no-ops.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("participation not found")]
    ParticipationNotFound,
    #[error("exam not found")]
    ExamNotFound,
    #[error("question not found in this exam")]
    QuestionNotFound,
    #[error("answer not found")]
    AnswerNotFound,
    #[error("session was already started")]
    AlreadyStarted,
    #[error("session was already finished")]
    AlreadyFinished,
    #[error("exam window has not opened yet")]
    NotYetOpen,
    #[error("exam window has closed")]
    WindowClosed,
    #[error("participation is blocked")]
    Blocked,
    #[error("session is not in progress")]
    SessionNotActive,
    #[error("participation is not blocked")]
    NotBlocked,
    #[error("invalid unlock code")]
    InvalidUnlockCode,
    #[error("could not generate a unique unlock code")]
    UnlockCodeExhausted,
    #[error("block reason must not be empty")]
    BlockReasonRequired,
    #[error("manual score must be between 0 and 100")]
    ManualScoreOutOfRange,
    #[error("manual scores apply to essay questions only")]
    NotAnEssayQuestion,
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl SessionError {
    /// Guard violations are expected races or caller mistakes; everything
    /// else is infrastructure.
    pub fn is_guard_violation(&self) -> bool {
        !matches!(self, SessionError::Store(_))
    }
}
