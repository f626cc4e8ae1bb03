use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use exam_core::model::TickOutcome;

use super::controller::SharedExam;

/// Why the timer task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStop {
    /// The last second ran out and the session finished on a tick.
    Expired,
    /// The session had already finished by other means.
    Finished,
    /// The handle was cancelled or dropped.
    Cancelled,
}

/// Owns the background countdown of one session.
///
/// The task ticks the session once per period on a single sequential loop, so
/// ticks never overlap. Cancelling is idempotent, and dropping the handle
/// cancels the task. No tick lands after `cancel` returns, even one that was
/// already waiting for the session lock.
#[derive(Debug)]
pub struct TimerHandle {
    cancel: Option<oneshot::Sender<()>>,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<TimerStop>>,
}

impl TimerHandle {
    /// Start a one-second countdown for `exam`. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(exam: SharedExam) -> Self {
        Self::spawn_with_period(exam, Duration::from_secs(1))
    }

    #[must_use]
    pub fn spawn_with_period(exam: SharedExam, period: Duration) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run(exam, period, cancel_rx, Arc::clone(&cancelled)));
        log::debug!("exam timer started ({period:?} period)");
        Self {
            cancel: Some(cancel_tx),
            cancelled,
            task: Some(task),
        }
    }

    /// Stop the countdown. Returns `true` only for the call that actually
    /// cancelled; later calls are no-ops.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => {
                // Set before waking the task so a tick blocked on the lock sees it.
                self.cancelled.store(true, Ordering::Release);
                // The task may already be gone; either way it no longer ticks.
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }

    /// Wait for the task to stop. `None` if the task panicked or was already joined.
    pub async fn join(mut self) -> Option<TimerStop> {
        let task = self.task.take()?;
        match task.await {
            Ok(stop) => Some(stop),
            Err(err) => {
                log::error!("exam timer task failed: {err}");
                None
            }
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(
    exam: SharedExam,
    period: Duration,
    mut cancel: oneshot::Receiver<()>,
    cancelled: Arc<AtomicBool>,
) -> TimerStop {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                log::debug!("exam timer cancelled");
                return TimerStop::Cancelled;
            }
            _ = ticks.tick() => {
                let mut guard = exam.lock().await;
                if cancelled.load(Ordering::Acquire) {
                    log::debug!("exam timer cancelled while waiting for the session");
                    return TimerStop::Cancelled;
                }
                match guard.tick() {
                    TickOutcome::Running { .. } => {}
                    TickOutcome::Expired(_) => {
                        log::info!("exam time is up");
                        return TimerStop::Expired;
                    }
                    TickOutcome::Idle => {
                        log::debug!("exam timer stopped: session already finished");
                        return TimerStop::Finished;
                    }
                }
            }
        }
    }
}
