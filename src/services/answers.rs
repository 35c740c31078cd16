use std::collections::BTreeSet;

use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{ParticipationStatus, QuestionKind};
use crate::repositories;
use crate::services::error::SessionError;

/// What the student sends for one question. Choice questions fill
/// `selected_option_ids`; essays fill `essay_text`.
#[derive(Debug, Clone, Default)]
pub struct AnswerPayload {
    pub selected_option_ids: Vec<String>,
    pub essay_text: Option<String>,
}

/// Outcome reported back to the submitting student. Deliberately omits the
/// computed correctness so the exam taker cannot probe for right answers;
/// grading collaborators read correctness from the store instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Stored { answer_id: String },
    Deleted { answer_id: String },
    Noop,
}

enum ResolvedAnswer {
    Choice { selected: Vec<String>, is_correct: bool },
    Essay { text: String },
    Empty,
}

/// Upserts the single answer row for (session, question), deleting it when
/// the resolved payload is empty. Requires an in-progress session.
pub async fn submit_answer(
    state: &AppState,
    participation_id: &str,
    question_id: &str,
    payload: &AnswerPayload,
) -> Result<AnswerOutcome, SessionError> {
    let participation = repositories::participations::find_by_id(state.db(), participation_id)
        .await?
        .ok_or(SessionError::ParticipationNotFound)?;

    if participation.status != ParticipationStatus::InProgress {
        return Err(SessionError::SessionNotActive);
    }

    let question =
        repositories::questions::find_assigned(state.db(), &participation.exam_id, question_id)
            .await?
            .ok_or(SessionError::QuestionNotFound)?;

    let correct_ids = match question.kind {
        QuestionKind::SingleChoice | QuestionKind::MultipleChoice => {
            repositories::questions::correct_option_ids(state.db(), &question.question_id).await?
        }
        QuestionKind::Essay => Vec::new(),
    };

    let resolved = resolve_payload(question.kind, &correct_ids, payload);
    let existing = repositories::answers::find_by_participation_and_question(
        state.db(),
        participation_id,
        &question.question_id,
    )
    .await?;

    let now = primitive_now_utc();
    match resolved {
        ResolvedAnswer::Empty => match existing {
            // Clearing an answered question removes the row instead of
            // storing an empty answer.
            Some(answer) => {
                repositories::answers::delete_by_id(state.db(), &answer.id).await?;
                Ok(AnswerOutcome::Deleted { answer_id: answer.id })
            }
            None => Ok(AnswerOutcome::Noop),
        },
        ResolvedAnswer::Choice { selected, is_correct } => {
            let id = existing.map(|a| a.id).unwrap_or_else(|| Uuid::new_v4().to_string());
            let answer_id = repositories::answers::upsert(
                state.db(),
                repositories::answers::UpsertAnswer {
                    id: &id,
                    participation_id,
                    question_id,
                    selected_option_ids: selected,
                    essay_text: None,
                    is_correct: Some(is_correct),
                    now,
                },
            )
            .await?;
            Ok(AnswerOutcome::Stored { answer_id })
        }
        ResolvedAnswer::Essay { text } => {
            let id = existing.map(|a| a.id).unwrap_or_else(|| Uuid::new_v4().to_string());
            let answer_id = repositories::answers::upsert(
                state.db(),
                repositories::answers::UpsertAnswer {
                    id: &id,
                    participation_id,
                    question_id,
                    selected_option_ids: Vec::new(),
                    essay_text: Some(&text),
                    is_correct: None,
                    now,
                },
            )
            .await?;
            Ok(AnswerOutcome::Stored { answer_id })
        }
    }
}

/// Entry point for the external teacher-grading workflow. Attaches a manual
/// 0-100 score to an essay answer; participation status is untouched, the
/// score only takes effect through an explicit grading finalization.
pub async fn set_manual_score(
    state: &AppState,
    answer_id: &str,
    score: f64,
) -> Result<(), SessionError> {
    if !(0.0..=100.0).contains(&score) {
        return Err(SessionError::ManualScoreOutOfRange);
    }

    let answer = repositories::answers::find_with_kind(state.db(), answer_id)
        .await?
        .ok_or(SessionError::AnswerNotFound)?;

    if answer.kind != QuestionKind::Essay {
        return Err(SessionError::NotAnEssayQuestion);
    }

    let updated =
        repositories::answers::set_manual_score(state.db(), &answer.id, score, primitive_now_utc())
            .await?;
    if !updated {
        return Err(SessionError::AnswerNotFound);
    }

    Ok(())
}

fn resolve_payload(
    kind: QuestionKind,
    correct_option_ids: &[String],
    payload: &AnswerPayload,
) -> ResolvedAnswer {
    match kind {
        QuestionKind::SingleChoice | QuestionKind::MultipleChoice => {
            let selected: Vec<String> = payload
                .selected_option_ids
                .iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();

            if selected.is_empty() {
                return ResolvedAnswer::Empty;
            }

            let is_correct = match kind {
                QuestionKind::SingleChoice => {
                    selected.len() == 1
                        && correct_option_ids.len() == 1
                        && selected[0] == correct_option_ids[0]
                }
                // Exact set match, order-independent, no partial credit.
                QuestionKind::MultipleChoice => {
                    let submitted: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
                    let correct: BTreeSet<&str> =
                        correct_option_ids.iter().map(String::as_str).collect();
                    !correct.is_empty() && submitted == correct
                }
                QuestionKind::Essay => unreachable!(),
            };

            ResolvedAnswer::Choice { selected, is_correct }
        }
        QuestionKind::Essay => match payload.essay_text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => ResolvedAnswer::Essay { text: text.to_string() },
            _ => ResolvedAnswer::Empty,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn choice_payload(values: &[&str]) -> AnswerPayload {
        AnswerPayload { selected_option_ids: ids(values), essay_text: None }
    }

    fn resolve_correctness(
        kind: QuestionKind,
        correct: &[&str],
        payload: &AnswerPayload,
    ) -> Option<bool> {
        match resolve_payload(kind, &ids(correct), payload) {
            ResolvedAnswer::Choice { is_correct, .. } => Some(is_correct),
            _ => None,
        }
    }

    #[test]
    fn single_choice_matches_the_unique_correct_option() {
        let payload = choice_payload(&["opt-a"]);
        assert_eq!(
            resolve_correctness(QuestionKind::SingleChoice, &["opt-a"], &payload),
            Some(true)
        );
        assert_eq!(
            resolve_correctness(QuestionKind::SingleChoice, &["opt-b"], &payload),
            Some(false)
        );
    }

    #[test]
    fn single_choice_with_multiple_selections_is_wrong() {
        let payload = choice_payload(&["opt-a", "opt-b"]);
        assert_eq!(
            resolve_correctness(QuestionKind::SingleChoice, &["opt-a"], &payload),
            Some(false)
        );
    }

    #[test]
    fn multiple_choice_requires_exact_set_match() {
        let correct = ["opt-a", "opt-c"];
        assert_eq!(
            resolve_correctness(
                QuestionKind::MultipleChoice,
                &correct,
                &choice_payload(&["opt-c", "opt-a"])
            ),
            Some(true)
        );
        assert_eq!(
            resolve_correctness(
                QuestionKind::MultipleChoice,
                &correct,
                &choice_payload(&["opt-a", "opt-c", "opt-d"])
            ),
            Some(false)
        );
        assert_eq!(
            resolve_correctness(QuestionKind::MultipleChoice, &correct, &choice_payload(&["opt-a"])),
            Some(false)
        );
    }

    #[test]
    fn duplicate_selections_collapse_to_a_set() {
        assert_eq!(
            resolve_correctness(
                QuestionKind::MultipleChoice,
                &["opt-a", "opt-c"],
                &choice_payload(&["opt-a", "opt-a", "opt-c"])
            ),
            Some(true)
        );
    }

    #[test]
    fn empty_choice_payload_resolves_to_empty() {
        let payload = choice_payload(&[]);
        assert!(matches!(
            resolve_payload(QuestionKind::SingleChoice, &ids(&["opt-a"]), &payload),
            ResolvedAnswer::Empty
        ));

        let whitespace = choice_payload(&["  "]);
        assert!(matches!(
            resolve_payload(QuestionKind::MultipleChoice, &ids(&["opt-a"]), &whitespace),
            ResolvedAnswer::Empty
        ));
    }

    #[test]
    fn blank_essay_resolves_to_empty() {
        let payload =
            AnswerPayload { selected_option_ids: Vec::new(), essay_text: Some("   ".to_string()) };
        assert!(matches!(resolve_payload(QuestionKind::Essay, &[], &payload), ResolvedAnswer::Empty));
    }

    #[test]
    fn essay_text_is_trimmed_and_kept() {
        let payload = AnswerPayload {
            selected_option_ids: Vec::new(),
            essay_text: Some("  an answer  ".to_string()),
        };
        match resolve_payload(QuestionKind::Essay, &[], &payload) {
            ResolvedAnswer::Essay { text } => assert_eq!(text, "an answer"),
            _ => panic!("expected essay"),
        }
    }
}
