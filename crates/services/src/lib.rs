#![forbid(unsafe_code)]

pub mod error;
pub mod exam;
pub mod notifier;
pub mod sources;

pub use exam_core::Clock;

pub use error::{ExamServiceError, HistoryError, QuestionSourceError};
pub use exam::{
    AttemptListItem, ExamController, ExamLoopService, HistoryOverview, HistoryService,
    SharedExam, TimerHandle, TimerStop,
};
pub use notifier::{ChannelNotifier, LogNotifier, ResultNotice, ResultNotifier};
pub use sources::{
    HttpQuestionSource, HttpSourceConfig, QuestionSource, RepositoryQuestionSource,
    StaticQuestionSource,
};
