/// Answer progress of an attempt, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub all_answered: bool,
}
