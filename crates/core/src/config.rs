//! Exam configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_QUESTION_COUNT: usize = 40;
/// 90 minutes.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 90 * 60;
pub const DEFAULT_PASS_PERCENT: u8 = 65;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("question_count must be greater than zero")]
    ZeroQuestions,

    #[error("time_limit_secs must be greater than zero")]
    ZeroTimeLimit,

    #[error("pass_percent must be within 1..=100, got {0}")]
    PassPercentOutOfRange(u8),
}

/// Shape of one exam: how many questions, how long, and what it takes to pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExamConfig {
    pub question_count: usize,
    pub time_limit_secs: u32,
    pub pass_percent: u8,
    pub shuffle_questions: bool,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            pass_percent: DEFAULT_PASS_PERCENT,
            shuffle_questions: false,
        }
    }
}

impl ExamConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if any bound is zero or the pass percent exceeds 100.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.question_count == 0 {
            return Err(ConfigError::ZeroQuestions);
        }
        if self.time_limit_secs == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        if self.pass_percent == 0 || self.pass_percent > 100 {
            return Err(ConfigError::PassPercentOutOfRange(self.pass_percent));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit_secs = secs;
        self
    }

    #[must_use]
    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle_questions = shuffle;
        self
    }

    /// Minimum number of correct answers needed to pass `total` questions:
    /// `ceil(pass_percent * total / 100)`.
    #[must_use]
    pub fn pass_threshold(&self, total: usize) -> usize {
        (usize::from(self.pass_percent) * total).div_ceil(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_26_of_40() {
        let config = ExamConfig::default();
        assert_eq!(config.pass_threshold(40), 26);
        assert_eq!(config.pass_threshold(10), 7);
        assert_eq!(config.pass_threshold(1), 1);
    }

    #[test]
    fn validate_rejects_zero_bounds() {
        assert_eq!(
            ExamConfig::default().with_question_count(0).validate(),
            Err(ConfigError::ZeroQuestions)
        );
        assert_eq!(
            ExamConfig::default().with_time_limit(0).validate(),
            Err(ConfigError::ZeroTimeLimit)
        );
        let config = ExamConfig {
            pass_percent: 101,
            ..ExamConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PassPercentOutOfRange(101)));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ExamConfig = serde_json::from_str(r#"{ "time_limit_secs": 600 }"#).unwrap();
        assert_eq!(config.time_limit_secs, 600);
        assert_eq!(config.question_count, DEFAULT_QUESTION_COUNT);
        assert_eq!(config.pass_percent, DEFAULT_PASS_PERCENT);
    }
}
