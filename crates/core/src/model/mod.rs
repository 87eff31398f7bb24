mod ids;
mod plan;
mod question;
mod result;
mod submission;

pub use ids::{QuestionId, ResultId, TestId};

pub use plan::{DEFAULT_QUESTION_COUNT, DEFAULT_TIME_LIMIT_MINUTES, ExamPlan, ExamType, GenerateRequest};
pub use question::{AnswerOption, Question, QuestionError, QuestionSet, QuestionSetError};
pub use result::{ExamResult, ResultItem, SubjectBreakdown};
pub use submission::{SubmittedAnswer, Submission, UNANSWERED};
