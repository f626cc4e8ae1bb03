use exam_core::model::{AttemptSummary, ExamId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    exam_id_from_i64, exam_id_to_i64, parse_finish_reason, ser, u32_from_i64, usize_from_i64,
};
use crate::repository::{AttemptCounts, AttemptId, AttemptRepository, AttemptRow, StorageError};

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptSummary, StorageError> {
    let exam_id = exam_id_from_i64(row.try_get::<i64, _>("exam_id").map_err(ser)?)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let correct = u32_from_i64(
        "correct_count",
        row.try_get::<i64, _>("correct_count").map_err(ser)?,
    )?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let passed = row.try_get::<i64, _>("passed").map_err(ser)? != 0;
    let time_spent = u32_from_i64(
        "time_spent_secs",
        row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
    )?;
    let reason = parse_finish_reason(&row.try_get::<String, _>("finish_reason").map_err(ser)?)?;

    AttemptSummary::from_persisted(
        exam_id,
        started_at,
        completed_at,
        correct,
        total,
        passed,
        time_spent,
        reason,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptSummary) -> Result<AttemptId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    exam_id, started_at, completed_at, correct_count,
                    total_questions, passed, time_spent_secs, finish_reason
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(exam_id_to_i64(attempt.exam_id())?)
        .bind(attempt.started_at())
        .bind(attempt.completed_at())
        .bind(i64::from(attempt.correct_count()))
        .bind(i64::from(attempt.total_questions()))
        .bind(i64::from(attempt.passed()))
        .bind(i64::from(attempt.time_spent_secs()))
        .bind(attempt.finish_reason().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    exam_id, started_at, completed_at, correct_count,
                    total_questions, passed, time_spent_secs, finish_reason
                FROM attempts
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn list_attempt_rows(
        &self,
        exam_id: ExamId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, exam_id, started_at, completed_at, correct_count,
                    total_questions, passed, time_spent_secs, finish_reason
                FROM attempts
                WHERE exam_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(exam_id_to_i64(exam_id)?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            out.push(AttemptRow::new(id, map_attempt_row(&row)?));
        }
        Ok(out)
    }

    async fn count_attempts(&self, exam_id: ExamId) -> Result<AttemptCounts, StorageError> {
        let row = sqlx::query(
            r"
                SELECT COUNT(*) AS total, COALESCE(SUM(passed), 0) AS passed
                FROM attempts
                WHERE exam_id = ?1
            ",
        )
        .bind(exam_id_to_i64(exam_id)?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(AttemptCounts {
            total: usize_from_i64("total", row.try_get("total").map_err(ser)?)?,
            passed: usize_from_i64("passed", row.try_get("passed").map_err(ser)?)?,
        })
    }
}
