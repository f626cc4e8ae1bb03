use async_trait::async_trait;
use exam_core::model::{AttemptSummary, ExamId, Question};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a persisted attempt.
///
/// This is an `i64` to match `SQLite` row IDs.
pub type AttemptId = i64;

/// A persisted attempt together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub attempt: AttemptSummary,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: AttemptId, attempt: AttemptSummary) -> Self {
        Self { id, attempt }
    }
}

/// Attempt totals of one exam, independent of any listing limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptCounts {
    pub total: usize,
    pub passed: usize,
}

/// Repository contract for question banks.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Replace the whole bank of an exam, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the questions cannot be stored.
    async fn replace_questions(
        &self,
        exam_id: ExamId,
        questions: &[Question],
    ) -> Result<(), StorageError>;

    /// Fetch the bank of an exam in its stored order. Empty if none exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decoding failures.
    async fn list_questions(&self, exam_id: ExamId) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for the attempt history.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a finished attempt and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &AttemptSummary) -> Result<AttemptId, StorageError>;

    /// Fetch one attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptSummary, StorageError>;

    /// List attempts of an exam, newest first, at most `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decoding failures.
    async fn list_attempt_rows(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;

    /// Count every stored attempt of an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn count_attempts(&self, exam_id: ExamId) -> Result<AttemptCounts, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<ExamId, Vec<Question>>>>,
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn replace_questions(
        &self,
        exam_id: ExamId,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(exam_id, questions.to_vec());
        Ok(())
    }

    async fn list_questions(&self, exam_id: ExamId) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&exam_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptSummary) -> Result<AttemptId, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = guard.last().map_or(1, |row| row.id + 1);
        guard.push(AttemptRow::new(id, attempt.clone()));
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptSummary, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.attempt.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempt_rows(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .filter(|row| row.attempt.exam_id() == exam_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.attempt
                .completed_at()
                .cmp(&a.attempt.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn count_attempts(&self, exam_id: ExamId) -> Result<AttemptCounts, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|row| row.attempt.exam_id() == exam_id)
            .fold(AttemptCounts::default(), |counts, row| AttemptCounts {
                total: counts.total + 1,
                passed: counts.passed + usize::from(row.attempt.passed()),
            }))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            questions,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::sample::{sample_attempts, sample_questions};
    use exam_core::time::fixed_now;

    #[tokio::test]
    async fn replaces_and_lists_questions_in_order() {
        let repo = InMemoryRepository::new();
        let exam = ExamId::new(1);
        assert!(repo.list_questions(exam).await.unwrap().is_empty());

        let questions = sample_questions(5).unwrap();
        repo.replace_questions(exam, &questions).await.unwrap();
        repo.replace_questions(exam, &questions[..3]).await.unwrap();

        let stored = repo.list_questions(exam).await.unwrap();
        assert_eq!(stored, questions[..3].to_vec());
    }

    #[tokio::test]
    async fn lists_attempts_newest_first_with_limit() {
        let repo = InMemoryRepository::new();
        let exam = ExamId::new(1);
        let mut attempts = sample_attempts(exam, fixed_now());
        attempts.reverse();
        for attempt in &attempts {
            repo.append_attempt(attempt).await.unwrap();
        }
        let other = sample_attempts(ExamId::new(2), fixed_now());
        repo.append_attempt(&other[0]).await.unwrap();

        let rows = repo.list_attempt_rows(exam, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].attempt.correct_count(), 29);
        assert_eq!(rows[1].attempt.correct_count(), 25);
        assert_eq!(rows[0].id, 3);

        let fetched = repo.get_attempt(rows[1].id).await.unwrap();
        assert_eq!(fetched, rows[1].attempt);
        assert!(matches!(
            repo.get_attempt(99).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn counts_attempts_per_exam() {
        let repo = InMemoryRepository::new();
        let exam = ExamId::new(1);
        assert_eq!(
            repo.count_attempts(exam).await.unwrap(),
            AttemptCounts::default()
        );

        for attempt in &sample_attempts(exam, fixed_now()) {
            repo.append_attempt(attempt).await.unwrap();
        }
        repo.append_attempt(&sample_attempts(ExamId::new(2), fixed_now())[0])
            .await
            .unwrap();

        let counts = repo.count_attempts(exam).await.unwrap();
        assert_eq!(counts, AttemptCounts { total: 3, passed: 2 });
    }
}
