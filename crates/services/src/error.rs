//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::config::ConfigError;
use exam_core::model::{AttemptError, ExamError, QuestionError, QuestionSetError};
use storage::repository::StorageError;

/// Errors emitted by question sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSourceError {
    #[error("remote question source is not configured")]
    Disabled,
    #[error("question source returned no questions")]
    Empty,
    #[error("question source request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Core(#[from] exam_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by exam services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServiceError {
    #[error("exam session has not finished yet")]
    NotFinished,
    #[error(transparent)]
    Source(#[from] QuestionSourceError),
    #[error(transparent)]
    QuestionSet(#[from] QuestionSetError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the history service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
