use serde::{Deserialize, Serialize};

use crate::config::ExamConfig;
use crate::model::answers::AnswerMap;
use crate::model::question::QuestionSet;

/// Score of an attempt. Always derived from answers and questions, never stored
/// on the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub correct_count: u32,
    pub total: u32,
    pub score_percent: f64,
    pub passed: bool,
}

impl ExamResult {
    /// Build a result from raw counts, applying the configured pass threshold.
    #[must_use]
    pub fn from_counts(correct_count: u32, total: u32, config: &ExamConfig) -> Self {
        let threshold = config.pass_threshold(total as usize);
        Self {
            correct_count,
            total,
            score_percent: score_percent(correct_count, total),
            passed: total > 0 && correct_count as usize >= threshold,
        }
    }
}

/// `correct / total * 100`, or `0.0` for an empty exam.
#[must_use]
pub fn score_percent(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(correct) / f64::from(total) * 100.0
}

/// Count answers matching the correct option and apply the pass threshold.
///
/// Answers keyed by ids that are not in `questions` are ignored.
#[must_use]
pub fn compute_result(
    questions: &QuestionSet,
    answers: &AnswerMap,
    config: &ExamConfig,
) -> ExamResult {
    let correct = questions
        .iter()
        .filter(|q| answers.get(q.id()).is_some_and(|choice| q.is_correct(choice)))
        .count();
    let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let correct = u32::try_from(correct).unwrap_or(u32::MAX);
    ExamResult::from_counts(correct, total, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use crate::model::question::Question;

    fn bank(n: usize) -> QuestionSet {
        let questions = (1..=n)
            .map(|i| {
                Question::new(
                    format!("q{i}"),
                    format!("Question {i}"),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    0,
                    None,
                )
                .unwrap()
            })
            .collect();
        QuestionSet::new(questions).unwrap()
    }

    fn answer_correctly(answers: &mut AnswerMap, range: std::ops::RangeInclusive<usize>) {
        for i in range {
            answers.upsert(QuestionId::new(format!("q{i}")), 0);
        }
    }

    #[test]
    fn boundary_at_65_percent() {
        let questions = bank(40);
        let config = ExamConfig::default();

        let mut answers = AnswerMap::new();
        answer_correctly(&mut answers, 1..=26);
        let result = compute_result(&questions, &answers, &config);
        assert_eq!(result.correct_count, 26);
        assert!(result.passed);

        let mut answers = AnswerMap::new();
        answer_correctly(&mut answers, 1..=25);
        answers.upsert(QuestionId::new("q26"), 3);
        let result = compute_result(&questions, &answers, &config);
        assert_eq!(result.correct_count, 25);
        assert!(!result.passed);
        assert!((result.score_percent - 62.5).abs() < f64::EPSILON);
    }

    #[test]
    fn compute_is_idempotent() {
        let questions = bank(40);
        let config = ExamConfig::default();
        let mut answers = AnswerMap::new();
        answer_correctly(&mut answers, 1..=30);

        let first = compute_result(&questions, &answers, &config);
        let second = compute_result(&questions, &answers, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let questions = bank(4);
        let mut answers = AnswerMap::new();
        answers.upsert(QuestionId::new("q99"), 0);
        let result = compute_result(&questions, &answers, &ExamConfig::default());
        assert_eq!(result.correct_count, 0);
        assert_eq!(result.total, 4);
    }

    #[test]
    fn empty_total_never_passes() {
        let result = ExamResult::from_counts(0, 0, &ExamConfig::default());
        assert!(!result.passed);
        assert!(result.score_percent.abs() < f64::EPSILON);
    }
}
