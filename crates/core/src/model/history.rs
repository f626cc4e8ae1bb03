use serde::Serialize;

use crate::model::attempt::AttemptSummary;

/// Aggregate figures shown above the attempt list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_attempts: usize,
    pub passed_attempts: usize,
    /// `None` when there are no attempts.
    pub average_score: Option<f64>,
    pub best_score: Option<f64>,
    pub average_time_spent_secs: Option<u32>,
}

impl HistoryStats {
    #[must_use]
    pub fn from_attempts(attempts: &[AttemptSummary]) -> Self {
        let total_attempts = attempts.len();
        let passed_attempts = attempts.iter().filter(|a| a.passed()).count();

        if attempts.is_empty() {
            return Self {
                total_attempts,
                passed_attempts,
                average_score: None,
                best_score: None,
                average_time_spent_secs: None,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let count = total_attempts as f64;
        let average_score = attempts.iter().map(AttemptSummary::score_percent).sum::<f64>() / count;
        let best_score = attempts
            .iter()
            .map(AttemptSummary::score_percent)
            .fold(f64::MIN, f64::max);
        let total_secs: u64 = attempts
            .iter()
            .map(|a| u64::from(a.time_spent_secs()))
            .sum();
        let average_secs = total_secs / total_attempts as u64;

        Self {
            total_attempts,
            passed_attempts,
            average_score: Some(average_score),
            best_score: Some(best_score),
            average_time_spent_secs: Some(u32::try_from(average_secs).unwrap_or(u32::MAX)),
        }
    }

    /// Share of passed attempts in percent, `None` without attempts.
    #[must_use]
    pub fn pass_rate(&self) -> Option<f64> {
        if self.total_attempts == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.passed_attempts as f64 / self.total_attempts as f64 * 100.0;
        Some(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamId;
    use crate::sample::sample_attempts;
    use crate::time::fixed_now;

    #[test]
    fn stats_over_sample_history() {
        let attempts = sample_attempts(ExamId::new(1), fixed_now());
        let stats = HistoryStats::from_attempts(&attempts);

        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.passed_attempts, 2);
        assert!((stats.average_score.unwrap() - 67.5).abs() < 1e-9);
        assert!((stats.best_score.unwrap() - 72.5).abs() < 1e-9);
        assert_eq!(stats.average_time_spent_secs, Some((75 + 90 + 82) * 60 / 3));
    }

    #[test]
    fn empty_history_has_no_averages() {
        let stats = HistoryStats::from_attempts(&[]);
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.average_score, None);
        assert_eq!(stats.best_score, None);
        assert_eq!(stats.pass_rate(), None);
    }
}
