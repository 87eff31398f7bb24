use prep_core::model::{QuestionId, TestId};

use super::session::{ExamSession, SubmissionState};

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    /// Present only after the learner picked an option.
    pub explanation: Option<String>,
}

/// Presentation-agnostic snapshot of an attempt.
///
/// This is intentionally **not** a UI view-model: strings are raw content,
/// apart from the `MM:SS` countdown every front end renders the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamView {
    pub test_id: TestId,
    pub index: usize,
    pub total: usize,
    pub question: Option<QuestionView>,
    pub remaining_seconds: u32,
    pub remaining_display: String,
    pub answered: usize,
    pub all_answered: bool,
    pub live_score: u32,
    pub can_go_previous: bool,
    pub can_go_next: bool,
    /// Manual submit is offered only once every question is answered.
    pub can_submit: bool,
    pub submitting: bool,
    /// Position within the exam, 1..=100.
    pub progress_percent: u32,
}

impl ExamView {
    #[must_use]
    pub fn from_session(session: &ExamSession) -> Self {
        let index = session.current_index();
        let total = session.total_questions();
        let question = session.current_question().map(|question| {
            let selected = session.answer_for(question.id());
            QuestionView {
                id: question.id().clone(),
                prompt: question.prompt().to_owned(),
                options: question.options().iter().map(|o| o.text.clone()).collect(),
                selected,
                explanation: selected
                    .and(question.explanation())
                    .map(str::to_owned),
            }
        });

        let progress_percent = if total == 0 {
            0
        } else {
            u32::try_from(((index + 1) * 100 / total).min(100)).unwrap_or(100)
        };

        Self {
            test_id: session.test_id().clone(),
            index,
            total,
            question,
            remaining_seconds: session.remaining_seconds(),
            remaining_display: session.countdown().display(),
            answered: session.answered_count(),
            all_answered: session.all_answered(),
            live_score: session.live_score(),
            can_go_previous: index > 0,
            can_go_next: index + 1 < total,
            can_submit: session.all_answered()
                && *session.submission_state() == SubmissionState::Open,
            submitting: session.is_submitting(),
            progress_percent,
        }
    }
}
