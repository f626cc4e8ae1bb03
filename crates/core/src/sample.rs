//! Bundled CTFL-style sample bank and history, used by the seed binary, the
//! built-in question source and tests.

use chrono::{DateTime, Duration, Utc};

use crate::model::{
    AttemptSummary, DEFAULT_OPTION_COUNT, ExamId, FinishReason, Question, QuestionError,
};

const SAMPLE_PROMPT: &str =
    "Which of the following options best describes software testing in the CTFL context?";

const SAMPLE_OPTIONS: [&str; DEFAULT_OPTION_COUNT] = [
    "A process of verifying that the software works as specified",
    "An activity performed only after development is complete",
    "A process that guarantees the absence of defects",
    "A programming technique to avoid bugs",
];

const SAMPLE_EXPLANATION: &str =
    "Software testing is a verification and validation process that checks the software meets its specified requirements.";

/// Build `count` sample questions with ids `q1..=q{count}`.
///
/// # Errors
///
/// Only fails if the bundled text stops passing `Question` validation.
pub fn sample_questions(count: usize) -> Result<Vec<Question>, QuestionError> {
    (1..=count)
        .map(|n| {
            Question::new(
                format!("q{n}"),
                format!("Question {n}: {SAMPLE_PROMPT}"),
                SAMPLE_OPTIONS.iter().map(|o| (*o).to_owned()).collect(),
                0,
                Some(SAMPLE_EXPLANATION.to_owned()),
            )
        })
        .collect()
}

/// Three finished attempts ending before `now`: 29/40, 25/40 and 27/40.
#[must_use]
pub fn sample_attempts(exam_id: ExamId, now: DateTime<Utc>) -> Vec<AttemptSummary> {
    let rows: [(i64, u32, u32); 3] = [(3, 29, 75), (8, 25, 90), (13, 27, 82)];
    rows.iter()
        .filter_map(|&(days_ago, correct, minutes)| {
            let completed_at = now - Duration::days(days_ago);
            let started_at = completed_at - Duration::minutes(i64::from(minutes));
            let passed = correct >= 26;
            let reason = if minutes >= 90 {
                FinishReason::TimedOut
            } else {
                FinishReason::Submitted
            };
            AttemptSummary::from_persisted(
                exam_id,
                started_at,
                completed_at,
                correct,
                40,
                passed,
                minutes * 60,
                reason,
            )
            .ok()
        })
        .collect()
}
