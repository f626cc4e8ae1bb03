mod answers;
mod attempt;
mod history;
mod ids;
mod question;
mod result;
mod session;

pub use ids::{ExamId, ParseIdError, QuestionId};

pub use answers::AnswerMap;
pub use attempt::{AttemptError, AttemptSummary};
pub use history::HistoryStats;
pub use question::{
    DEFAULT_OPTION_COUNT, Question, QuestionError, QuestionSet, QuestionSetError, option_label,
};
pub use result::{ExamResult, compute_result, score_percent};
pub use session::{ExamError, ExamProgress, ExamSession, ExamState, FinishReason, TickOutcome};
