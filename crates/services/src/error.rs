//! Shared error types for the services crate.

use thiserror::Error;

use api::ApiError;
use prep_core::model::{QuestionId, QuestionSetError};

/// Errors emitted while starting an exam session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Questions(#[from] QuestionSetError),
}

/// Errors emitted when a submission is not accepted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Rejected answer selections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(QuestionId),
    #[error("option {index} is out of range for a question with {len} options")]
    OptionOutOfRange { index: usize, len: usize },
}

/// Errors emitted by `ResultService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultError {
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted by `ExamPlanService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerateError {
    #[error(transparent)]
    Api(#[from] ApiError),
}
