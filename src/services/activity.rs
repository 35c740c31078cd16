use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

#[derive(Debug, Clone, Copy)]
pub(crate) enum ActivityKind {
    SessionStarted,
    SessionFinished,
    SessionAutoFinished,
    ExamAutoExpired,
    ParticipantBlocked,
    UnlockCodeGenerated,
    ParticipantUnblocked,
    GradingFinalized,
}

impl ActivityKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ActivityKind::SessionStarted => "SESSION_STARTED",
            ActivityKind::SessionFinished => "SESSION_FINISHED",
            ActivityKind::SessionAutoFinished => "SESSION_AUTO_FINISHED",
            ActivityKind::ExamAutoExpired => "EXAM_AUTO_EXPIRED",
            ActivityKind::ParticipantBlocked => "PARTICIPANT_BLOCKED",
            ActivityKind::UnlockCodeGenerated => "UNLOCK_CODE_GENERATED",
            ActivityKind::ParticipantUnblocked => "PARTICIPANT_UNBLOCKED",
            ActivityKind::GradingFinalized => "GRADING_FINALIZED",
        }
    }
}

/// Fire-and-forget append to the activity-log sink. The sink must never break
/// the main flow, so insert failures are logged and swallowed.
pub(crate) async fn record(
    state: &AppState,
    kind: ActivityKind,
    user_id: Option<&str>,
    participation_id: Option<&str>,
    description: &str,
    metadata: Option<serde_json::Value>,
) {
    let id = Uuid::new_v4().to_string();
    let log = repositories::activity_logs::NewActivityLog {
        id: &id,
        user_id,
        participation_id,
        activity_type: kind.as_str(),
        description,
        metadata,
        created_at: primitive_now_utc(),
    };

    if let Err(err) = repositories::activity_logs::insert(state.db(), log).await {
        tracing::warn!(
            activity_type = kind.as_str(),
            error = %err,
            "Failed to append activity log entry"
        );
    }
}
