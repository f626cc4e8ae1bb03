use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use exam_core::Clock;
use exam_core::model::{
    ExamError, ExamProgress, ExamResult, ExamSession, FinishReason, Question, QuestionId,
    TickOutcome,
};
use storage::repository::AttemptId;

use crate::notifier::{ResultNotice, ResultNotifier};

/// A controller shared between its owner and the background timer. One lock
/// per session; every mutation goes through it.
pub type SharedExam = Arc<Mutex<ExamController>>;

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one `ExamSession` and tells the `ResultNotifier` exactly once when
/// it finishes, either by submission or by timeout.
pub struct ExamController {
    session: ExamSession,
    clock: Clock,
    notifier: Arc<dyn ResultNotifier>,
    notified: bool,
    attempt_id: Option<AttemptId>,
}

impl ExamController {
    #[must_use]
    pub fn new(session: ExamSession, clock: Clock, notifier: Arc<dyn ResultNotifier>) -> Self {
        Self {
            session,
            clock,
            notifier,
            notified: false,
            attempt_id: None,
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedExam {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        self.session.current_question()
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        self.session.progress()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt_id
    }

    pub(crate) fn set_attempt_id(&mut self, id: AttemptId) {
        self.attempt_id = Some(id);
    }

    /// # Errors
    ///
    /// Propagates the session's precondition errors; state is unchanged on error.
    pub fn select_answer(&mut self, question_id: &QuestionId, option: usize) -> Result<(), ExamError> {
        self.session.select_answer(question_id, option)
    }

    /// # Errors
    ///
    /// Propagates the session's precondition errors; state is unchanged on error.
    pub fn select_current(&mut self, option: usize) -> Result<(), ExamError> {
        self.session.select_current(option)
    }

    /// # Errors
    ///
    /// Propagates the session's precondition errors; state is unchanged on error.
    pub fn go_to_question(&mut self, index: usize) -> Result<(), ExamError> {
        self.session.go_to_question(index)
    }

    /// # Errors
    ///
    /// `ExamError::Finished` once the session ended.
    pub fn advance(&mut self) -> Result<usize, ExamError> {
        self.session.advance()
    }

    /// # Errors
    ///
    /// `ExamError::Finished` once the session ended.
    pub fn retreat(&mut self) -> Result<usize, ExamError> {
        self.session.retreat()
    }

    /// Consume one second; announces the result when this tick expires the session.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.session.tick(self.clock.now());
        if let TickOutcome::Expired(result) = outcome {
            self.announce(&result, FinishReason::TimedOut);
        }
        outcome
    }

    /// Submit the attempt and announce the result.
    ///
    /// # Errors
    ///
    /// `ExamError::Incomplete` unless every question is answered,
    /// `ExamError::Finished` if already finished.
    pub fn finish(&mut self) -> Result<ExamResult, ExamError> {
        let result = self.session.finish(self.clock.now())?;
        self.announce(&result, FinishReason::Submitted);
        Ok(result)
    }

    #[must_use]
    pub fn compute_result(&self) -> ExamResult {
        self.session.compute_result()
    }

    fn announce(&mut self, result: &ExamResult, reason: FinishReason) {
        if self.notified {
            return;
        }
        self.notified = true;
        self.notifier.notify(&ResultNotice::new(result, reason));
    }
}

impl fmt::Debug for ExamController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamController")
            .field("current", &self.session.current_index())
            .field("answered", &self.session.answered_count())
            .field("remaining_secs", &self.session.remaining_secs())
            .field("state", &self.session.state())
            .field("notified", &self.notified)
            .field("attempt_id", &self.attempt_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use exam_core::ExamConfig;
    use exam_core::model::QuestionSet;
    use exam_core::sample::sample_questions;
    use exam_core::time::{fixed_clock, fixed_now};

    #[derive(Default)]
    struct Recorder {
        notices: StdMutex<Vec<ResultNotice>>,
    }

    impl ResultNotifier for Recorder {
        fn notify(&self, notice: &ResultNotice) {
            self.notices.lock().unwrap().push(*notice);
        }
    }

    fn controller(n: usize, secs: u32, recorder: &Arc<Recorder>) -> ExamController {
        let set = QuestionSet::new(sample_questions(n).unwrap()).unwrap();
        let config = ExamConfig::default()
            .with_question_count(n)
            .with_time_limit(secs);
        let session = ExamSession::start(set, config, fixed_now()).unwrap();
        let notifier: Arc<dyn ResultNotifier> = recorder.clone();
        ExamController::new(session, fixed_clock(), notifier)
    }

    #[test]
    fn submission_notifies_once() {
        let recorder = Arc::new(Recorder::default());
        let mut exam = controller(2, 60, &recorder);
        exam.select_current(0).unwrap();
        exam.advance().unwrap();
        exam.select_current(0).unwrap();

        let result = exam.finish().unwrap();
        assert!(result.passed);
        assert_eq!(exam.finish(), Err(ExamError::Finished));
        assert_eq!(exam.tick(), TickOutcome::Idle);

        let notices = recorder.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].reason, FinishReason::Submitted);
        assert_eq!(notices[0].correct_count, 2);
    }

    #[test]
    fn timeout_notifies_with_partial_answers() {
        let recorder = Arc::new(Recorder::default());
        let mut exam = controller(40, 2, &recorder);
        for _ in 0..10 {
            exam.select_current(1).unwrap();
            exam.advance().unwrap();
        }

        assert!(matches!(exam.tick(), TickOutcome::Running { remaining_secs: 1 }));
        assert!(matches!(exam.tick(), TickOutcome::Expired(_)));
        assert_eq!(exam.tick(), TickOutcome::Idle);

        let notices = recorder.notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].reason, FinishReason::TimedOut);
        assert_eq!(notices[0].correct_count, 0);
        assert!(!notices[0].passed);
    }

    #[test]
    fn incomplete_finish_does_not_notify() {
        let recorder = Arc::new(Recorder::default());
        let mut exam = controller(3, 60, &recorder);
        exam.select_current(0).unwrap();
        assert!(matches!(exam.finish(), Err(ExamError::Incomplete { .. })));
        assert!(recorder.notices.lock().unwrap().is_empty());
        assert!(!exam.is_finished());
    }
}
