use std::collections::HashMap;

use crate::db::models::AssignedQuestion;
use crate::db::types::QuestionKind;

/// Grading facts for one answered question.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AnswerFacts {
    pub(crate) is_correct: Option<bool>,
    pub(crate) manual_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreBreakdown {
    pub(crate) score: f64,
    pub(crate) earned_weight: f64,
    pub(crate) total_weight: f64,
    pub(crate) has_essay: bool,
    /// Essay questions still lacking a manual score. While non-zero, the
    /// final score is provisional.
    pub(crate) pending_essays: usize,
}

impl ScoreBreakdown {
    pub(crate) fn pending_essay_grading(&self) -> bool {
        self.pending_essays > 0
    }
}

/// Weighted 0-100 score over the exam's question list. Pure and
/// deterministic: re-finishing a session with unchanged answers always
/// produces the same score.
///
/// Choice questions earn their full weight when the stored correctness flag
/// is true. Essay questions earn `(manual_score / 100) * weight` once a
/// manual score exists and contribute zero until then.
pub(crate) fn compute_score(
    questions: &[AssignedQuestion],
    answers: &HashMap<String, AnswerFacts>,
) -> ScoreBreakdown {
    let mut earned_weight = 0.0;
    let mut total_weight = 0.0;
    let mut has_essay = false;
    let mut pending_essays = 0;

    for question in questions {
        total_weight += question.weight;
        let facts = answers.get(&question.question_id);

        match question.kind {
            QuestionKind::SingleChoice | QuestionKind::MultipleChoice => {
                if facts.and_then(|f| f.is_correct).unwrap_or(false) {
                    earned_weight += question.weight;
                }
            }
            QuestionKind::Essay => {
                has_essay = true;
                match facts.and_then(|f| f.manual_score) {
                    Some(manual) => earned_weight += (manual / 100.0) * question.weight,
                    None => pending_essays += 1,
                }
            }
        }
    }

    let raw = if total_weight > 0.0 { (earned_weight / total_weight) * 100.0 } else { 0.0 };

    ScoreBreakdown {
        score: round_score(raw),
        earned_weight,
        total_weight,
        has_essay,
        pending_essays,
    }
}

fn round_score(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, kind: QuestionKind, weight: f64) -> AssignedQuestion {
        AssignedQuestion { question_id: id.to_string(), kind, weight }
    }

    fn correct() -> AnswerFacts {
        AnswerFacts { is_correct: Some(true), manual_score: None }
    }

    fn wrong() -> AnswerFacts {
        AnswerFacts { is_correct: Some(false), manual_score: None }
    }

    fn essay(manual: Option<f64>) -> AnswerFacts {
        AnswerFacts { is_correct: None, manual_score: manual }
    }

    #[test]
    fn ungraded_essay_contributes_zero() {
        let questions = vec![
            question("q1", QuestionKind::SingleChoice, 30.0),
            question("q2", QuestionKind::MultipleChoice, 20.0),
            question("q3", QuestionKind::Essay, 50.0),
        ];
        let answers = HashMap::from([
            ("q1".to_string(), correct()),
            ("q2".to_string(), correct()),
            ("q3".to_string(), essay(None)),
        ]);

        let breakdown = compute_score(&questions, &answers);
        assert_eq!(breakdown.score, 50.0);
        assert!(breakdown.has_essay);
        assert_eq!(breakdown.pending_essays, 1);
        assert!(breakdown.pending_essay_grading());
    }

    #[test]
    fn manual_essay_score_is_weighted() {
        let questions = vec![
            question("q1", QuestionKind::SingleChoice, 30.0),
            question("q2", QuestionKind::MultipleChoice, 20.0),
            question("q3", QuestionKind::Essay, 50.0),
        ];
        let answers = HashMap::from([
            ("q1".to_string(), correct()),
            ("q2".to_string(), correct()),
            ("q3".to_string(), essay(Some(80.0))),
        ]);

        let breakdown = compute_score(&questions, &answers);
        assert_eq!(breakdown.score, 90.0);
        assert_eq!(breakdown.pending_essays, 0);
        assert!(!breakdown.pending_essay_grading());
    }

    #[test]
    fn weights_need_not_sum_to_one_hundred() {
        let questions = vec![
            question("q1", QuestionKind::SingleChoice, 2.0),
            question("q2", QuestionKind::SingleChoice, 6.0),
        ];
        let answers = HashMap::from([("q1".to_string(), correct()), ("q2".to_string(), wrong())]);

        assert_eq!(compute_score(&questions, &answers).score, 25.0);
    }

    #[test]
    fn missing_answer_earns_nothing() {
        let questions = vec![question("q1", QuestionKind::MultipleChoice, 10.0)];
        let answers = HashMap::new();

        assert_eq!(compute_score(&questions, &answers).score, 0.0);
    }

    #[test]
    fn empty_question_list_scores_zero() {
        let breakdown = compute_score(&[], &HashMap::new());
        assert_eq!(breakdown.score, 0.0);
        assert_eq!(breakdown.total_weight, 0.0);
    }

    #[test]
    fn score_is_rounded_to_two_decimals() {
        let questions = vec![
            question("q1", QuestionKind::SingleChoice, 1.0),
            question("q2", QuestionKind::SingleChoice, 1.0),
            question("q3", QuestionKind::SingleChoice, 1.0),
        ];
        let answers = HashMap::from([("q1".to_string(), correct())]);

        assert_eq!(compute_score(&questions, &answers).score, 33.33);
    }

    #[test]
    fn grading_is_deterministic() {
        let questions = vec![
            question("q1", QuestionKind::SingleChoice, 40.0),
            question("q2", QuestionKind::Essay, 60.0),
        ];
        let answers =
            HashMap::from([("q1".to_string(), correct()), ("q2".to_string(), essay(Some(55.0)))]);

        let first = compute_score(&questions, &answers);
        let second = compute_score(&questions, &answers);
        assert_eq!(first, second);
    }
}
