use std::sync::{Arc, Mutex};

use exam_core::ExamConfig;
use exam_core::model::{ExamError, ExamId, FinishReason, QuestionId, TickOutcome};
use exam_core::sample::sample_questions;
use exam_core::time::fixed_now;
use services::{
    Clock, ExamLoopService, ExamServiceError, HistoryService, QuestionSourceError,
    RepositoryQuestionSource, ResultNotice, ResultNotifier, StaticQuestionSource,
};
use storage::repository::{AttemptRepository, InMemoryRepository, Storage};

#[derive(Default)]
struct Recorder {
    notices: Mutex<Vec<ResultNotice>>,
}

impl ResultNotifier for Recorder {
    fn notify(&self, notice: &ResultNotice) {
        self.notices.lock().unwrap().push(*notice);
    }
}

fn loop_service(
    storage: &Storage,
    recorder: &Arc<Recorder>,
    config: ExamConfig,
) -> ExamLoopService {
    let source = Arc::new(StaticQuestionSource::sample(config.question_count).unwrap());
    ExamLoopService::new(
        Clock::fixed(fixed_now()),
        ExamId::new(1),
        source,
        recorder.clone(),
        Arc::clone(&storage.attempts),
    )
    .with_config(config)
}

#[tokio::test]
async fn all_correct_attempt_is_scored_and_recorded() {
    let storage = Storage::sqlite("sqlite:file:memdb_exam_flow?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let recorder = Arc::new(Recorder::default());
    let service = loop_service(&storage, &recorder, ExamConfig::default());

    let mut exam = service.start_exam().await.unwrap();
    assert_eq!(exam.progress().total, 40);
    assert_eq!(exam.session().remaining_secs(), 5400);

    loop {
        let correct = exam.current_question().correct_option();
        exam.select_current(correct).unwrap();
        let index = exam.session().current_index();
        if exam.advance().unwrap() == index {
            break;
        }
    }

    let result = exam.finish().unwrap();
    assert_eq!(result.correct_count, 40);
    assert!((result.score_percent - 100.0).abs() < f64::EPSILON);
    assert!(result.passed);

    let id = service.record_attempt(&mut exam).await.unwrap();
    assert_eq!(service.record_attempt(&mut exam).await.unwrap(), id);

    let stored = storage.attempts.get_attempt(id).await.unwrap();
    assert_eq!(stored.correct_count(), 40);
    assert_eq!(stored.finish_reason(), FinishReason::Submitted);

    let history = HistoryService::new(Arc::clone(&storage.attempts));
    let overview = history.overview(ExamId::new(1), 10).await.unwrap();
    assert_eq!(overview.stats.total_attempts, 1);
    assert_eq!(overview.stats.best_score, Some(100.0));

    let notices = recorder.notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].passed);
}

#[tokio::test]
async fn timeout_with_ten_wrong_answers_fails() {
    let storage = Storage::in_memory();
    let recorder = Arc::new(Recorder::default());
    let service = loop_service(&storage, &recorder, ExamConfig::default().with_time_limit(5));

    let mut exam = service.start_exam().await.unwrap();
    for i in 1..=10 {
        exam.select_answer(&QuestionId::new(format!("q{i}")), 3).unwrap();
    }
    assert!(matches!(
        exam.finish(),
        Err(ExamError::Incomplete {
            answered: 10,
            total: 40
        })
    ));
    assert!(matches!(
        service.record_attempt(&mut exam).await,
        Err(ExamServiceError::NotFinished)
    ));

    let mut expired = None;
    for _ in 0..5 {
        if let TickOutcome::Expired(result) = exam.tick() {
            expired = Some(result);
        }
    }
    let result = expired.expect("time should run out");
    assert_eq!(result.correct_count, 0);
    assert!(!result.passed);
    assert_eq!(exam.session().finish_reason(), Some(FinishReason::TimedOut));

    let before = exam.session().answers().clone();
    assert_eq!(
        exam.select_answer(&QuestionId::new("q11"), 0),
        Err(ExamError::Finished)
    );
    assert_eq!(exam.session().answers(), &before);

    let id = service.record_attempt(&mut exam).await.unwrap();
    let stored = storage.attempts.get_attempt(id).await.unwrap();
    assert_eq!(stored.time_spent_secs(), 5);
    assert_eq!(stored.finish_reason(), FinishReason::TimedOut);
}

#[tokio::test]
async fn start_refuses_bank_of_wrong_size() {
    let storage = Storage::in_memory();
    let recorder = Arc::new(Recorder::default());
    let service = ExamLoopService::new(
        Clock::fixed(fixed_now()),
        ExamId::new(1),
        Arc::new(StaticQuestionSource::sample(10).unwrap()),
        recorder,
        Arc::clone(&storage.attempts),
    );

    let err = service.start_exam().await.unwrap_err();
    assert!(matches!(
        err,
        ExamServiceError::Exam(ExamError::QuestionCountMismatch {
            expected: 40,
            found: 10
        })
    ));
}

#[tokio::test]
async fn repository_source_feeds_a_shuffled_exam() {
    let repo = InMemoryRepository::new();
    let exam_id = ExamId::new(7);
    let questions = sample_questions(40).unwrap();
    storage::repository::QuestionRepository::replace_questions(&repo, exam_id, &questions)
        .await
        .unwrap();

    let service = ExamLoopService::new(
        Clock::fixed(fixed_now()),
        exam_id,
        Arc::new(RepositoryQuestionSource::new(exam_id, Arc::new(repo.clone()))),
        Arc::new(Recorder::default()),
        Arc::new(repo.clone()),
    )
    .with_config(ExamConfig::default().with_shuffle(true));

    let exam = service.start_exam().await.unwrap();
    let mut ids: Vec<String> = exam
        .session()
        .questions()
        .iter()
        .map(|q| q.id().to_string())
        .collect();
    ids.sort();
    let mut expected: Vec<String> = questions.iter().map(|q| q.id().to_string()).collect();
    expected.sort();
    assert_eq!(ids, expected);

    let empty = ExamLoopService::new(
        Clock::fixed(fixed_now()),
        ExamId::new(8),
        Arc::new(RepositoryQuestionSource::new(ExamId::new(8), Arc::new(repo.clone()))),
        Arc::new(Recorder::default()),
        Arc::new(repo),
    );
    assert!(matches!(
        empty.start_exam().await.unwrap_err(),
        ExamServiceError::Source(QuestionSourceError::Empty)
    ));
}
