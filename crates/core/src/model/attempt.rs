use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ExamId;
use crate::model::result::score_percent;
use crate::model::session::{ExamSession, FinishReason};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("attempt has no questions")]
    EmptyExam,

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("session is still in progress")]
    NotFinished,
}

/// Persistable summary of a finished exam attempt, as listed in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    exam_id: ExamId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    correct_count: u32,
    total_questions: u32,
    passed: bool,
    time_spent_secs: u32,
    finish_reason: FinishReason,
}

impl AttemptSummary {
    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` if the time range is inverted, the exam is empty,
    /// or `correct_count` exceeds `total_questions`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        exam_id: ExamId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        correct_count: u32,
        total_questions: u32,
        passed: bool,
        time_spent_secs: u32,
        finish_reason: FinishReason,
    ) -> Result<Self, AttemptError> {
        if completed_at < started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        if total_questions == 0 {
            return Err(AttemptError::EmptyExam);
        }
        if correct_count > total_questions {
            return Err(AttemptError::CountMismatch {
                correct: correct_count,
                total: total_questions,
            });
        }

        Ok(Self {
            exam_id,
            started_at,
            completed_at,
            correct_count,
            total_questions,
            passed,
            time_spent_secs,
            finish_reason,
        })
    }

    /// Summarise a finished session.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotFinished` while the session is still running.
    pub fn from_session(exam_id: ExamId, session: &ExamSession) -> Result<Self, AttemptError> {
        let (Some(reason), Some(completed_at)) = (session.finish_reason(), session.finished_at())
        else {
            return Err(AttemptError::NotFinished);
        };
        let result = session.compute_result();

        Self::from_persisted(
            exam_id,
            session.started_at(),
            completed_at,
            result.correct_count,
            result.total,
            result.passed,
            session.elapsed_secs(),
            reason,
        )
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn finish_reason(&self) -> FinishReason {
        self.finish_reason
    }

    #[must_use]
    pub fn score_percent(&self) -> f64 {
        score_percent(self.correct_count, self.total_questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExamConfig;
    use crate::model::question::{Question, QuestionSet};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn session() -> ExamSession {
        let questions = (1..=2)
            .map(|i| {
                Question::new(
                    format!("q{i}"),
                    "prompt",
                    vec!["a".into(), "b".into()],
                    0,
                    None,
                )
                .unwrap()
            })
            .collect();
        let config = ExamConfig::default()
            .with_question_count(2)
            .with_time_limit(120);
        ExamSession::start(QuestionSet::new(questions).unwrap(), config, fixed_now()).unwrap()
    }

    #[test]
    fn summary_from_finished_session() {
        let mut session = session();
        for _ in 0..30 {
            session.tick(fixed_now());
        }
        session.select_current(0).unwrap();
        session.advance().unwrap();
        session.select_current(1).unwrap();
        session.finish(fixed_now() + Duration::seconds(30)).unwrap();

        let attempt = AttemptSummary::from_session(ExamId::new(1), &session).unwrap();
        assert_eq!(attempt.correct_count(), 1);
        assert_eq!(attempt.total_questions(), 2);
        assert!(!attempt.passed());
        assert_eq!(attempt.time_spent_secs(), 30);
        assert_eq!(attempt.finish_reason(), FinishReason::Submitted);
        assert!((attempt.score_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_requires_finished_session() {
        let err = AttemptSummary::from_session(ExamId::new(1), &session()).unwrap_err();
        assert_eq!(err, AttemptError::NotFinished);
    }

    #[test]
    fn persisted_validation() {
        let now = fixed_now();
        let earlier = now - Duration::minutes(5);
        let reason = FinishReason::Submitted;
        assert_eq!(
            AttemptSummary::from_persisted(ExamId::new(1), now, earlier, 1, 2, false, 0, reason),
            Err(AttemptError::InvalidTimeRange)
        );
        assert_eq!(
            AttemptSummary::from_persisted(ExamId::new(1), earlier, now, 3, 2, true, 0, reason),
            Err(AttemptError::CountMismatch { correct: 3, total: 2 })
        );
        assert_eq!(
            AttemptSummary::from_persisted(ExamId::new(1), earlier, now, 0, 0, false, 0, reason),
            Err(AttemptError::EmptyExam)
        );
    }
}
