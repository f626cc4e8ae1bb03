//! Result notifiers: fire-and-forget feedback when an exam ends.

use tokio::sync::mpsc;

use exam_core::model::{ExamResult, FinishReason};

/// What a notifier receives once per finished session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultNotice {
    pub correct_count: u32,
    pub total: u32,
    pub passed: bool,
    pub score_percent: f64,
    pub reason: FinishReason,
}

impl ResultNotice {
    #[must_use]
    pub fn new(result: &ExamResult, reason: FinishReason) -> Self {
        Self {
            correct_count: result.correct_count,
            total: result.total,
            passed: result.passed,
            score_percent: result.score_percent,
            reason,
        }
    }

    /// Headline and detail line, e.g. `("Passed!", "29/40 correct (72.5%)")`.
    #[must_use]
    pub fn headline(&self) -> (&'static str, String) {
        let title = if self.passed { "Passed!" } else { "Not passed" };
        let detail = format!(
            "{}/{} correct ({:.1}%)",
            self.correct_count, self.total, self.score_percent
        );
        (title, detail)
    }
}

/// Receives the verdict of a finished session. Implementations must not block.
pub trait ResultNotifier: Send + Sync {
    fn notify(&self, notice: &ResultNotice);
}

/// Writes the verdict to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ResultNotifier for LogNotifier {
    fn notify(&self, notice: &ResultNotice) {
        let (title, detail) = notice.headline();
        if notice.passed {
            log::info!("{title} {detail} [{}]", notice.reason.as_str());
        } else {
            log::warn!("{title} {detail} [{}]", notice.reason.as_str());
        }
    }
}

/// Forwards notices to an unbounded channel, e.g. for a front-end task.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ResultNotice>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResultNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultNotifier for ChannelNotifier {
    fn notify(&self, notice: &ResultNotice) {
        if self.tx.send(*notice).is_err() {
            log::debug!("result notice dropped: receiver closed");
        }
    }
}
