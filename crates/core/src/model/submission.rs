use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::question::QuestionSet;

/// Wire value for a question the learner never answered.
pub const UNANSWERED: i64 = -1;

/// One entry of the submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_index: i64,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected_index != UNANSWERED
    }
}

/// Final answers for an attempt, one entry per question in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub answers: Vec<SubmittedAnswer>,
}

impl Submission {
    /// Build the payload from the recorded answers.
    ///
    /// Unanswered questions are included with `UNANSWERED` so the server
    /// scores them as wrong instead of missing.
    #[must_use]
    pub fn from_answers(questions: &QuestionSet, answers: &HashMap<QuestionId, usize>) -> Self {
        let answers = questions
            .iter()
            .map(|question| SubmittedAnswer {
                question_id: question.id().clone(),
                selected_index: answers
                    .get(question.id())
                    .and_then(|&index| i64::try_from(index).ok())
                    .unwrap_or(UNANSWERED),
            })
            .collect();
        Self { answers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_answered()).count()
    }
}
