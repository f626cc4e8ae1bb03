use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use exam_core::model::{AttemptSummary, ExamId, ExamSession, QuestionSet};
use exam_core::{Clock, ExamConfig};
use storage::repository::{AttemptId, AttemptRepository};

use super::controller::ExamController;
use crate::error::ExamServiceError;
use crate::notifier::ResultNotifier;
use crate::sources::QuestionSource;

/// Orchestrates exam start and persisted attempts.
#[derive(Clone)]
pub struct ExamLoopService {
    clock: Clock,
    exam_id: ExamId,
    config: ExamConfig,
    source: Arc<dyn QuestionSource>,
    notifier: Arc<dyn ResultNotifier>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exam_id: ExamId,
        source: Arc<dyn QuestionSource>,
        notifier: Arc<dyn ResultNotifier>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            exam_id,
            config: ExamConfig::default(),
            source,
            notifier,
            attempts,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ExamConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    /// Load questions and start a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` when the configuration is invalid, the source
    /// fails, the questions do not form a valid set, or their count does not
    /// match the configuration.
    pub async fn start_exam(&self) -> Result<ExamController, ExamServiceError> {
        self.config.validate()?;

        let mut questions = self.source.load_questions().await?;
        if self.config.shuffle_questions {
            questions.shuffle(&mut rng());
        }
        let set = QuestionSet::new(questions)?;
        let session = ExamSession::start(set, self.config.clone(), self.clock.now())?;

        log::info!(
            "started exam {} with {} questions",
            self.exam_id,
            session.total_questions()
        );
        Ok(ExamController::new(
            session,
            self.clock,
            Arc::clone(&self.notifier),
        ))
    }

    /// Persist the finished attempt. Idempotent: a recorded attempt returns its
    /// existing id, so a failed append can simply be retried.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::NotFinished` while the session is running and
    /// `ExamServiceError::Storage` if persistence fails.
    pub async fn record_attempt(
        &self,
        exam: &mut ExamController,
    ) -> Result<AttemptId, ExamServiceError> {
        if let Some(id) = exam.attempt_id() {
            return Ok(id);
        }
        if !exam.is_finished() {
            return Err(ExamServiceError::NotFinished);
        }

        let attempt = AttemptSummary::from_session(self.exam_id, exam.session())?;
        let id = self.attempts.append_attempt(&attempt).await?;
        exam.set_attempt_id(id);
        log::debug!("recorded attempt {id} for exam {}", self.exam_id);
        Ok(id)
    }
}
