mod controller;
mod history;
mod timer;
mod workflow;

// Public API of the exam subsystem.
pub use crate::error::{ExamServiceError, HistoryError};
pub use controller::{ExamController, SharedExam};
pub use history::{AttemptListItem, HistoryOverview, HistoryService, STATS_WINDOW};
pub use timer::{TimerHandle, TimerStop};
pub use workflow::ExamLoopService;
