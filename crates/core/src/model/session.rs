use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, ExamConfig};
use crate::model::answers::AnswerMap;
use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionSet};
use crate::model::result::{ExamResult, compute_result};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejected session operations. The session is left untouched whenever one of
/// these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam session already finished")]
    Finished,

    #[error("unknown question: {0}")]
    UnknownQuestion(QuestionId),

    #[error("option {option} is out of range for question {id} ({len} options)")]
    OptionOutOfRange {
        id: QuestionId,
        option: usize,
        len: usize,
    },

    #[error("question index {index} is out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("cannot finish: {answered} of {total} questions answered")]
    Incomplete { answered: usize, total: usize },

    #[error("exam expects {expected} questions, got {found}")]
    QuestionCountMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Why a session left `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The candidate submitted with every question answered.
    Submitted,
    /// The time budget ran out.
    TimedOut,
}

impl FinishReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Submitted => "submitted",
            FinishReason::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamState {
    InProgress,
    Finished(FinishReason),
}

/// Outcome of a single timer tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// One second was consumed; this many remain.
    Running { remaining_secs: u32 },
    /// The last second was consumed and the session finished on this tick.
    Expired(ExamResult),
    /// The session was already finished; nothing changed.
    Idle,
}

/// Aggregated view of session progress, useful for front-ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamProgress {
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
    pub remaining_secs: u32,
}

impl ExamProgress {
    #[must_use]
    pub fn answered_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = self.answered as f64 / self.total as f64 * 100.0;
        pct
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at an exam, from start to a scored finish or timeout.
///
/// Every mutating operation validates its preconditions first and returns an
/// `ExamError` without touching state when they do not hold. `Finished` is
/// terminal.
#[derive(Debug, Clone)]
pub struct ExamSession {
    questions: QuestionSet,
    config: ExamConfig,
    current: usize,
    answers: AnswerMap,
    remaining_secs: u32,
    state: ExamState,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Start a session over `questions`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Config` for an invalid configuration and
    /// `ExamError::QuestionCountMismatch` when the set size differs from
    /// `config.question_count`.
    pub fn start(
        questions: QuestionSet,
        config: ExamConfig,
        started_at: DateTime<Utc>,
    ) -> Result<Self, ExamError> {
        config.validate()?;
        if questions.len() != config.question_count {
            return Err(ExamError::QuestionCountMismatch {
                expected: config.question_count,
                found: questions.len(),
            });
        }

        log::debug!(
            "exam session started: {} questions, {}s budget",
            questions.len(),
            config.time_limit_secs
        );

        Ok(Self {
            remaining_secs: config.time_limit_secs,
            questions,
            config,
            current: 0,
            answers: AnswerMap::new(),
            state: ExamState::InProgress,
            started_at,
            finished_at: None,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn state(&self) -> ExamState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ExamState::Finished(_))
    }

    #[must_use]
    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self.state {
            ExamState::InProgress => None,
            ExamState::Finished(reason) => Some(reason),
        }
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question under the pointer. The pointer is always in bounds.
    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions.as_slice()[self.current]
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.answers.len() == self.questions.len()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Seconds consumed from the budget so far.
    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.config.time_limit_secs.saturating_sub(self.remaining_secs)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn selected_option(&self, id: &QuestionId) -> Option<usize> {
        self.answers.get(id)
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            current_index: self.current,
            total: self.questions.len(),
            answered: self.answers.len(),
            remaining_secs: self.remaining_secs,
        }
    }

    fn ensure_in_progress(&self) -> Result<(), ExamError> {
        if self.is_finished() {
            return Err(ExamError::Finished);
        }
        Ok(())
    }

    /// Record `option` as the answer to `question_id`, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// `Finished` after the session ended, `UnknownQuestion` for ids outside the
    /// set, and `OptionOutOfRange` for an option the question does not have.
    pub fn select_answer(&mut self, question_id: &QuestionId, option: usize) -> Result<(), ExamError> {
        self.ensure_in_progress()?;
        let question = self
            .questions
            .find(question_id)
            .ok_or_else(|| ExamError::UnknownQuestion(question_id.clone()))?;
        if option >= question.option_count() {
            return Err(ExamError::OptionOutOfRange {
                id: question_id.clone(),
                option,
                len: question.option_count(),
            });
        }
        self.answers.upsert(question_id.clone(), option);
        Ok(())
    }

    /// Answer the question under the pointer.
    ///
    /// # Errors
    ///
    /// Same as [`ExamSession::select_answer`].
    pub fn select_current(&mut self, option: usize) -> Result<(), ExamError> {
        let id = self.current_question().id().clone();
        self.select_answer(&id, option)
    }

    /// Move the pointer to `index`.
    ///
    /// # Errors
    ///
    /// `Finished` after the session ended, `IndexOutOfRange` for `index >= N`.
    pub fn go_to_question(&mut self, index: usize) -> Result<(), ExamError> {
        self.ensure_in_progress()?;
        let len = self.questions.len();
        if index >= len {
            return Err(ExamError::IndexOutOfRange { index, len });
        }
        self.current = index;
        Ok(())
    }

    /// Step forward, staying on the last question at the end.
    ///
    /// # Errors
    ///
    /// `Finished` after the session ended.
    pub fn advance(&mut self) -> Result<usize, ExamError> {
        self.ensure_in_progress()?;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
        Ok(self.current)
    }

    /// Step back, staying on the first question at the start.
    ///
    /// # Errors
    ///
    /// `Finished` after the session ended.
    pub fn retreat(&mut self) -> Result<usize, ExamError> {
        self.ensure_in_progress()?;
        self.current = self.current.saturating_sub(1);
        Ok(self.current)
    }

    /// Consume one second of the budget. Reaching zero finishes the session as
    /// `TimedOut` within the same call, whatever the number of answers.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.is_finished() {
            return TickOutcome::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Running {
                remaining_secs: self.remaining_secs,
            };
        }

        let result = self.close(FinishReason::TimedOut, now);
        TickOutcome::Expired(result)
    }

    /// Submit the attempt.
    ///
    /// # Errors
    ///
    /// `Finished` if already finished, `Incomplete` unless every question has an answer.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<ExamResult, ExamError> {
        self.ensure_in_progress()?;
        if !self.is_complete() {
            return Err(ExamError::Incomplete {
                answered: self.answers.len(),
                total: self.questions.len(),
            });
        }
        Ok(self.close(FinishReason::Submitted, now))
    }

    fn close(&mut self, reason: FinishReason, now: DateTime<Utc>) -> ExamResult {
        self.state = ExamState::Finished(reason);
        self.finished_at = Some(now.max(self.started_at));
        let result = self.compute_result();
        log::info!(
            "exam session finished ({}): {}/{} correct, passed={}",
            reason.as_str(),
            result.correct_count,
            result.total,
            result.passed
        );
        result
    }

    /// Score the current answers. Pure; safe to call at any point.
    #[must_use]
    pub fn compute_result(&self) -> ExamResult {
        compute_result(&self.questions, &self.answers, &self.config)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
