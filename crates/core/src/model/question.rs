use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id is missing")]
    MissingId,

    #[error("question {0} has no options")]
    NoOptions(QuestionId),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("question set is empty")]
    Empty,

    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single selectable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    pub is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

/// A multiple-choice question as delivered by the Exam API.
///
/// Option order is stable: answers are recorded by index into `options`.
/// Exactly one option is expected to be marked correct, but that is trusted
/// input and not enforced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    explanation: Option<String>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError::MissingId` for a blank id and
    /// `QuestionError::NoOptions` when `options` is empty.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        if id.is_empty() {
            return Err(QuestionError::MissingId);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions(id));
        }
        let explanation = explanation.filter(|text| !text.trim().is_empty());

        Ok(Self {
            id,
            prompt: prompt.into(),
            options,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Index of the first option marked correct, if any.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|option| option.is_correct)
    }

    #[must_use]
    pub fn is_correct(&self, option_index: usize) -> bool {
        self.correct_index() == Some(option_index)
    }
}

//
// ─── QUESTION SET ─────────────────────────────────────────────────────────────
//

/// Ordered, immutable set of questions for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// # Errors
    ///
    /// Returns `QuestionSetError::Empty` for an empty list and
    /// `QuestionSetError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionSetError> {
        if questions.is_empty() {
            return Err(QuestionSetError::Empty);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuestionSetError::DuplicateId(question.id().clone()));
            }
        }

        Ok(Self { questions })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn find(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id() == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//
