use serde_json::json;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Participation;
use crate::repositories;
use crate::services::activity::{self, ActivityKind};
use crate::services::error::SessionError;
use crate::services::unlock_codes;

const MAX_CODE_ATTEMPTS: usize = 10;

/// Flags a participation for a policy violation. Orthogonal to the session
/// status: an in-progress session stays in progress and its deadline clock
/// keeps running. Any previously issued unlock code is left untouched; a
/// fresh one must be generated explicitly.
pub async fn block(
    state: &AppState,
    participation_id: &str,
    reason: &str,
) -> Result<(), SessionError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(SessionError::BlockReasonRequired);
    }

    let participation = fetch(state, participation_id).await?;
    repositories::participations::set_blocked(
        state.db(),
        participation_id,
        reason,
        primitive_now_utc(),
    )
    .await?;

    activity::record(
        state,
        ActivityKind::ParticipantBlocked,
        None,
        Some(participation_id),
        &format!("Participant blocked: {reason}"),
        Some(json!({
            "exam_id": participation.exam_id,
            "student_id": participation.student_id,
            "reason": reason,
        })),
    )
    .await;

    Ok(())
}

/// Issues a fresh single-use unlock code for a blocked participation. Codes
/// are unique among currently issued codes; generation retries on collision.
pub async fn generate_unlock_code(
    state: &AppState,
    participation_id: &str,
) -> Result<String, SessionError> {
    let participation = fetch(state, participation_id).await?;
    if !participation.is_blocked {
        return Err(SessionError::NotBlocked);
    }

    let mut code = unlock_codes::generate_unlock_code();
    let mut attempts = 1;
    while repositories::participations::unlock_code_exists(state.db(), &code).await? {
        if attempts >= MAX_CODE_ATTEMPTS {
            return Err(SessionError::UnlockCodeExhausted);
        }
        code = unlock_codes::generate_unlock_code();
        attempts += 1;
    }

    repositories::participations::set_unlock_code(
        state.db(),
        participation_id,
        &code,
        primitive_now_utc(),
    )
    .await?;

    activity::record(
        state,
        ActivityKind::UnlockCodeGenerated,
        None,
        Some(participation_id),
        "Unlock code generated for blocked participant",
        Some(json!({ "exam_id": participation.exam_id })),
    )
    .await;

    Ok(code)
}

/// Clears the block when the supplied code matches the issued one
/// (case-insensitive). The code is single-use: a successful unblock removes
/// it together with the flag and reason. A mismatch reveals nothing about
/// the stored code.
pub async fn unblock(
    state: &AppState,
    participation_id: &str,
    supplied_code: &str,
) -> Result<(), SessionError> {
    let participation = fetch(state, participation_id).await?;
    if !participation.is_blocked {
        return Err(SessionError::NotBlocked);
    }

    let matches = participation
        .unlock_code
        .as_deref()
        .is_some_and(|stored| unlock_codes::codes_match(stored, supplied_code));
    if !matches {
        return Err(SessionError::InvalidUnlockCode);
    }

    clear_and_log(state, &participation, "Participant unblocked with unlock code").await
}

/// Administrative override: clears the block without a code.
pub async fn force_unblock(state: &AppState, participation_id: &str) -> Result<(), SessionError> {
    let participation = fetch(state, participation_id).await?;
    if !participation.is_blocked {
        return Err(SessionError::NotBlocked);
    }

    clear_and_log(state, &participation, "Participant unblocked by administrative override").await
}

async fn clear_and_log(
    state: &AppState,
    participation: &Participation,
    description: &str,
) -> Result<(), SessionError> {
    repositories::participations::clear_block(state.db(), &participation.id, primitive_now_utc())
        .await?;

    activity::record(
        state,
        ActivityKind::ParticipantUnblocked,
        None,
        Some(&participation.id),
        description,
        Some(json!({
            "exam_id": participation.exam_id,
            "student_id": participation.student_id,
        })),
    )
    .await;

    Ok(())
}

async fn fetch(state: &AppState, participation_id: &str) -> Result<Participation, SessionError> {
    repositories::participations::find_by_id(state.db(), participation_id)
        .await?
        .ok_or(SessionError::ParticipationNotFound)
}
