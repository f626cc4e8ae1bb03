use exam_core::model::{ExamId, Question};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{exam_id_to_i64, ser, usize_from_i64, usize_to_i64};
use crate::repository::{QuestionRepository, StorageError};

fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let prompt: String = row.try_get("prompt").map_err(ser)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;
    let correct = usize_from_i64(
        "correct_option",
        row.try_get::<i64, _>("correct_option").map_err(ser)?,
    )?;
    let explanation: Option<String> = row.try_get("explanation").map_err(ser)?;

    Question::new(id, prompt, options, correct, explanation).map_err(ser)
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn replace_questions(
        &self,
        exam_id: ExamId,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        let exam = exam_id_to_i64(exam_id)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM questions WHERE exam_id = ?1")
            .bind(exam)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for (position, question) in questions.iter().enumerate() {
            let options = serde_json::to_string(question.options()).map_err(ser)?;
            sqlx::query(
                r"
                    INSERT INTO questions (
                        exam_id, id, position, prompt, options, correct_option, explanation
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(exam)
            .bind(question.id().as_str())
            .bind(usize_to_i64("position", position)?)
            .bind(question.prompt())
            .bind(options)
            .bind(usize_to_i64("correct_option", question.correct_option())?)
            .bind(question.explanation())
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
                other => StorageError::Connection(other.to_string()),
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        log::debug!("stored {} questions for exam {exam_id}", questions.len());
        Ok(())
    }

    async fn list_questions(&self, exam_id: ExamId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, prompt, options, correct_option, explanation
                FROM questions
                WHERE exam_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(exam_id_to_i64(exam_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}
