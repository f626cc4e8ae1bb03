use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use exam_core::model::{AttemptSummary, ExamId, FinishReason, HistoryStats};
use storage::repository::{AttemptId, AttemptRepository, AttemptRow};

use crate::error::HistoryError;

/// Default number of newest attempts folded into the score and time averages.
pub const STATS_WINDOW: u32 = 1_000;

/// Presentation-agnostic list item for one attempt.
///
/// No pre-formatted strings; front-ends format timestamps and durations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub completed_at: DateTime<Utc>,
    pub correct_count: u32,
    pub total_questions: u32,
    pub score_percent: f64,
    pub passed: bool,
    pub time_spent_secs: u32,
    pub finish_reason: FinishReason,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_row(row: &AttemptRow) -> Self {
        let attempt = &row.attempt;
        Self {
            id: row.id,
            completed_at: attempt.completed_at(),
            correct_count: attempt.correct_count(),
            total_questions: attempt.total_questions(),
            score_percent: attempt.score_percent(),
            passed: attempt.passed(),
            time_spent_secs: attempt.time_spent_secs(),
            finish_reason: attempt.finish_reason(),
        }
    }
}

/// Aggregates plus the most recent attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryOverview {
    pub exam_id: ExamId,
    pub stats: HistoryStats,
    pub recent: Vec<AttemptListItem>,
}

/// Read side of the attempt history.
#[derive(Clone)]
pub struct HistoryService {
    attempts: Arc<dyn AttemptRepository>,
    window: u32,
}

impl HistoryService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self {
            attempts,
            window: STATS_WINDOW,
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(storage::repository::InMemoryRepository::new()))
    }

    /// Most recent attempts first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, HistoryError> {
        let rows = self.attempts.list_attempt_rows(exam_id, limit).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }

    /// Aggregate figures. Attempt and pass counts cover every stored attempt;
    /// score and time averages cover the newest `window` ones.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn stats(&self, exam_id: ExamId) -> Result<HistoryStats, HistoryError> {
        let rows = self.attempts.list_attempt_rows(exam_id, self.window).await?;
        let attempts: Vec<AttemptSummary> = rows.into_iter().map(|row| row.attempt).collect();
        let counts = self.attempts.count_attempts(exam_id).await?;

        let mut stats = HistoryStats::from_attempts(&attempts);
        stats.total_attempts = counts.total;
        stats.passed_attempts = counts.passed;
        Ok(stats)
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn overview(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<HistoryOverview, HistoryError> {
        let stats = self.stats(exam_id).await?;
        let recent = self.list_recent(exam_id, limit).await?;
        Ok(HistoryOverview {
            exam_id,
            stats,
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::sample::sample_attempts;
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn overview_over_sample_history() {
        let repo = InMemoryRepository::new();
        let exam = ExamId::new(1);
        for attempt in sample_attempts(exam, fixed_now()) {
            repo.append_attempt(&attempt).await.unwrap();
        }

        let service = HistoryService::new(Arc::new(repo));
        let overview = service.overview(exam, 2).await.unwrap();

        assert_eq!(overview.stats.total_attempts, 3);
        assert_eq!(overview.stats.passed_attempts, 2);
        assert_eq!(overview.recent.len(), 2);
        assert_eq!(overview.recent[0].correct_count, 29);
        assert!((overview.recent[0].score_percent - 72.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn counts_cover_attempts_outside_the_window() {
        let repo = InMemoryRepository::new();
        let exam = ExamId::new(1);
        for attempt in sample_attempts(exam, fixed_now()) {
            repo.append_attempt(&attempt).await.unwrap();
        }

        let service = HistoryService::new(Arc::new(repo)).with_window(2);
        let stats = service.stats(exam).await.unwrap();

        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.passed_attempts, 2);
        assert!((stats.average_score.unwrap() - 67.5).abs() < 1e-9);
        assert!((stats.best_score.unwrap() - 72.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_history() {
        let service = HistoryService::in_memory();
        let stats = service.stats(ExamId::new(1)).await.unwrap();
        assert_eq!(stats.total_attempts, 0);
        assert!(service.list_recent(ExamId::new(1), 10).await.unwrap().is_empty());
    }
}
