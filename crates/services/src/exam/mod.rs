mod plan;
mod progress;
mod results;
mod session;
mod timer;
mod view;
mod workflow;

// Public API of the exam subsystem.
pub use crate::error::{AnswerError, LoadError, SubmitError};
pub use plan::ExamPlanService;
pub use progress::ExamProgress;
pub use results::ResultService;
pub use session::{Direction, ExamSession, SubmissionState, TickState};
pub use timer::CountdownTimer;
pub use view::{ExamView, QuestionView};
pub use workflow::{
    DEFAULT_DURATION_MINUTES, ExamLoopService, PendingSubmission, SubmitOutcome, SubmitTrigger,
    TickOutcome,
};
