use thiserror::Error;

use crate::config::ConfigError;
use crate::model::{AttemptError, ExamError, QuestionError, QuestionSetError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    QuestionSet(#[from] QuestionSetError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
