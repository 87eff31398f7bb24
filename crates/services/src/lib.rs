#![forbid(unsafe_code)]

pub mod error;
pub mod exam;

pub use prep_core::Clock;

pub use error::{AnswerError, GenerateError, LoadError, ResultError, SubmitError};
pub use exam::{
    CountdownTimer, Direction, ExamLoopService, ExamPlanService, ExamProgress, ExamSession,
    ExamView, PendingSubmission, ResultService, SubmissionState, SubmitOutcome, SubmitTrigger,
    TickOutcome, TickState,
};
