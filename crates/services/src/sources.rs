//! Question sources: where an exam's questions come from.

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use exam_core::model::{ExamId, Question, QuestionSet};
use exam_core::sample::sample_questions;
use storage::repository::QuestionRepository;

use crate::error::QuestionSourceError;

/// Provides the ordered questions of one exam configuration.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Load the questions in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError` when the questions cannot be loaded.
    async fn load_questions(&self) -> Result<Vec<Question>, QuestionSourceError>;
}

//
// ─── STATIC ────────────────────────────────────────────────────────────────────
//

/// Fixed in-memory list of questions.
#[derive(Debug, Clone)]
pub struct StaticQuestionSource {
    questions: Vec<Question>,
}

impl StaticQuestionSource {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// The bundled CTFL-style sample bank with `count` questions.
    ///
    /// # Errors
    ///
    /// Returns `exam_core::Error` if the bundled bank fails validation.
    pub fn sample(count: usize) -> Result<Self, exam_core::Error> {
        let questions = sample_questions(count)?;
        let set = QuestionSet::new(questions)?;
        Ok(Self::new(set.into_inner()))
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn load_questions(&self) -> Result<Vec<Question>, QuestionSourceError> {
        Ok(self.questions.clone())
    }
}

//
// ─── REPOSITORY ────────────────────────────────────────────────────────────────
//

/// Reads the bank of one exam from a `QuestionRepository`.
#[derive(Clone)]
pub struct RepositoryQuestionSource {
    exam_id: ExamId,
    questions: Arc<dyn QuestionRepository>,
}

impl RepositoryQuestionSource {
    #[must_use]
    pub fn new(exam_id: ExamId, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { exam_id, questions }
    }
}

#[async_trait]
impl QuestionSource for RepositoryQuestionSource {
    async fn load_questions(&self) -> Result<Vec<Question>, QuestionSourceError> {
        let questions = self.questions.list_questions(self.exam_id).await?;
        if questions.is_empty() {
            return Err(QuestionSourceError::Empty);
        }
        Ok(questions)
    }
}

//
// ─── HTTP ──────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct HttpSourceConfig {
    pub base_url: String,
    pub exam_id: ExamId,
}

impl HttpSourceConfig {
    /// Reads `EXAM_QUESTIONS_URL`; `None` when unset or blank.
    #[must_use]
    pub fn from_env(exam_id: ExamId) -> Option<Self> {
        let base_url = env::var("EXAM_QUESTIONS_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, exam_id })
    }

    #[must_use]
    pub fn questions_url(&self) -> String {
        format!(
            "{}/exams/{}/questions",
            self.base_url.trim_end_matches('/'),
            self.exam_id
        )
    }
}

/// Fetches a bank as JSON from `GET {base_url}/exams/{id}/questions`.
#[derive(Clone)]
pub struct HttpQuestionSource {
    client: Client,
    config: Option<HttpSourceConfig>,
}

impl HttpQuestionSource {
    #[must_use]
    pub fn new(config: Option<HttpSourceConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn load_questions(&self) -> Result<Vec<Question>, QuestionSourceError> {
        let config = self.config.as_ref().ok_or(QuestionSourceError::Disabled)?;

        let response = self.client.get(config.questions_url()).send().await?;
        if !response.status().is_success() {
            return Err(QuestionSourceError::HttpStatus(response.status()));
        }

        let body: Vec<QuestionPayload> = response.json().await?;
        if body.is_empty() {
            return Err(QuestionSourceError::Empty);
        }
        log::debug!("fetched {} questions from {}", body.len(), config.base_url);

        body.into_iter()
            .map(QuestionPayload::into_question)
            .collect()
    }
}

/// Wire shape of a remote question.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    id: String,
    #[serde(alias = "prompt")]
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    #[serde(default)]
    explanation: Option<String>,
}

impl QuestionPayload {
    fn into_question(self) -> Result<Question, QuestionSourceError> {
        Ok(Question::new(
            self.id,
            self.question,
            self.options,
            self.correct_answer,
            self.explanation,
        )?)
    }
}
