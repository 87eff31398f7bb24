use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use prep_core::Countdown;
use prep_core::model::{Question, QuestionId, QuestionSet, ResultId, Submission, TestId};

use super::progress::ExamProgress;
use crate::error::AnswerError;

//
// ─── TRANSITION TYPES ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Where the attempt is in its single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Open,
    InFlight,
    Submitted(ResultId),
}

/// What a single countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickState {
    Running { remaining_seconds: u32 },
    /// Time just ran out; the caller must submit now. Reported once per session.
    Expired,
    /// Nothing left to count: expiry already fired or the attempt was submitted.
    Idle,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one timed attempt.
///
/// All transitions take `&mut self`, so ticks, selections and navigation are
/// applied strictly one at a time. The live score is maintained
/// incrementally from the previous and new answer of the touched question.
pub struct ExamSession {
    test_id: TestId,
    questions: QuestionSet,
    answers: HashMap<QuestionId, usize>,
    current: usize,
    live_score: u32,
    countdown: Countdown,
    expiry_fired: bool,
    submission: SubmissionState,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Create a fresh attempt. `started_at` should come from the services clock.
    #[must_use]
    pub fn new(
        test_id: TestId,
        questions: QuestionSet,
        duration_minutes: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            test_id,
            questions,
            answers: HashMap::new(),
            current: 0,
            live_score: 0,
            countdown: Countdown::from_minutes(duration_minutes),
            expiry_fired: false,
            submission: SubmissionState::Open,
            started_at,
            submitted_at: None,
        }
    }

    #[must_use]
    pub fn test_id(&self) -> &TestId {
        &self.test_id
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn answer_for(&self, question_id: &QuestionId) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// True once every question has an answer. Gates the manual submit only.
    #[must_use]
    pub fn all_answered(&self) -> bool {
        self.questions
            .iter()
            .all(|question| self.answers.contains_key(question.id()))
    }

    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        let total = self.total_questions();
        let answered = self.answered_count();
        ExamProgress {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            all_answered: self.all_answered(),
        }
    }

    #[must_use]
    pub fn live_score(&self) -> u32 {
        self.live_score
    }

    /// Count correct answers from scratch.
    ///
    /// The live score never uses this; it is the reference the incremental
    /// updates must agree with, and the way to seed a resumed attempt.
    #[must_use]
    pub fn recompute_live_score(&self) -> u32 {
        let correct = self
            .answers
            .iter()
            .filter(|(id, index)| {
                self.questions
                    .find(id)
                    .is_some_and(|question| question.is_correct(**index))
            })
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.countdown.remaining_seconds()
    }

    #[must_use]
    pub fn expiry_fired(&self) -> bool {
        self.expiry_fired
    }

    #[must_use]
    pub fn submission_state(&self) -> &SubmissionState {
        &self.submission
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submission == SubmissionState::InFlight
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self.submission, SubmissionState::Submitted(_))
    }

    #[must_use]
    pub fn result_id(&self) -> Option<&ResultId> {
        match &self.submission {
            SubmissionState::Submitted(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// Answers can change only while the attempt is open and time remains.
    #[must_use]
    pub fn accepts_answers(&self) -> bool {
        self.submission == SubmissionState::Open && !self.countdown.is_expired()
    }

    /// Record `option_index` for `question_id`, replacing any earlier choice.
    ///
    /// Returns `Ok(false)` without touching state when the attempt no longer
    /// accepts answers.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::UnknownQuestion` or `AnswerError::OptionOutOfRange`
    /// for selections that do not fit the loaded questions.
    pub fn select_answer(
        &mut self,
        question_id: &QuestionId,
        option_index: usize,
    ) -> Result<bool, AnswerError> {
        if !self.accepts_answers() {
            debug!(test_id = %self.test_id, question_id = %question_id, "selection ignored, attempt closed");
            return Ok(false);
        }

        let question = self
            .questions
            .find(question_id)
            .ok_or_else(|| AnswerError::UnknownQuestion(question_id.clone()))?;
        let len = question.options().len();
        if option_index >= len {
            return Err(AnswerError::OptionOutOfRange {
                index: option_index,
                len,
            });
        }

        // Read the previous answer before overwriting it.
        let now_correct = question.is_correct(option_index);
        let previous = self.answers.insert(question_id.clone(), option_index);
        let was_correct = previous.is_some_and(|index| question.is_correct(index));

        match (was_correct, now_correct) {
            (false, true) => self.live_score = self.live_score.saturating_add(1),
            (true, false) => self.live_score = self.live_score.saturating_sub(1),
            _ => {}
        }
        debug_assert_eq!(self.live_score, self.recompute_live_score());

        debug!(
            test_id = %self.test_id,
            question_id = %question_id,
            option_index,
            live_score = self.live_score,
            "answer recorded"
        );
        Ok(true)
    }

    /// Move one question back or forward, clamped to the question range.
    pub fn navigate(&mut self, direction: Direction) -> usize {
        let last = self.questions.len().saturating_sub(1);
        self.current = match direction {
            Direction::Previous => self.current.saturating_sub(1),
            Direction::Next => (self.current + 1).min(last),
        };
        self.current
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickState {
        if self.expiry_fired || self.is_submitted() {
            return TickState::Idle;
        }

        let remaining_seconds = self.countdown.tick();
        if remaining_seconds > 0 {
            return TickState::Running { remaining_seconds };
        }

        self.expiry_fired = true;
        info!(
            test_id = %self.test_id,
            answered = self.answered_count(),
            total = self.total_questions(),
            "exam time expired"
        );
        TickState::Expired
    }

    /// Claim the single submission slot and build its payload.
    ///
    /// Returns `None` while another submission is in flight or after the
    /// attempt was submitted.
    pub fn begin_submission(&mut self) -> Option<Submission> {
        if self.submission != SubmissionState::Open {
            return None;
        }
        self.submission = SubmissionState::InFlight;
        Some(Submission::from_answers(&self.questions, &self.answers))
    }

    /// Mark the in-flight submission as accepted.
    pub fn complete_submission(&mut self, result_id: ResultId, submitted_at: DateTime<Utc>) -> bool {
        if self.submission != SubmissionState::InFlight {
            return false;
        }
        self.submission = SubmissionState::Submitted(result_id);
        self.submitted_at = Some(submitted_at);
        true
    }

    /// Reopen the attempt after a failed submission. Answers are kept.
    pub fn fail_submission(&mut self) -> bool {
        if self.submission != SubmissionState::InFlight {
            return false;
        }
        self.submission = SubmissionState::Open;
        true
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("test_id", &self.test_id)
            .field("questions_len", &self.questions.len())
            .field("answers_len", &self.answers.len())
            .field("current", &self.current)
            .field("live_score", &self.live_score)
            .field("countdown", &self.countdown)
            .field("expiry_fired", &self.expiry_fired)
            .field("submission", &self.submission)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{AnswerOption, UNANSWERED};
    use prep_core::time::fixed_now;

    fn question(id: &str, correct: usize) -> Question {
        let options = (0..3)
            .map(|i| AnswerOption::new(format!("{id} option {i}"), i == correct))
            .collect();
        Question::new(QuestionId::new(id), format!("prompt {id}"), options, None).unwrap()
    }

    /// Three questions with correct options at 1, 0 and 2.
    fn session(minutes: u32) -> ExamSession {
        let questions =
            QuestionSet::new(vec![question("q1", 1), question("q2", 0), question("q3", 2)])
                .unwrap();
        ExamSession::new(TestId::new("t1"), questions, minutes, fixed_now())
    }

    fn qid(id: &str) -> QuestionId {
        QuestionId::new(id)
    }

    #[test]
    fn starts_empty() {
        let session = session(1);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.live_score(), 0);
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.remaining_seconds(), 60);
        assert_eq!(session.submission_state(), &SubmissionState::Open);
        assert!(!session.all_answered());
    }

    #[test]
    fn live_score_tracks_answer_changes() {
        let mut session = session(10);

        session.select_answer(&qid("q1"), 1).unwrap();
        session.select_answer(&qid("q2"), 1).unwrap();
        session.select_answer(&qid("q3"), 2).unwrap();
        assert_eq!(session.live_score(), 2);

        session.select_answer(&qid("q2"), 0).unwrap();
        assert_eq!(session.live_score(), 3);

        let submission = session.begin_submission().unwrap();
        let payload: Vec<_> = submission
            .answers
            .iter()
            .map(|a| (a.question_id.as_str(), a.selected_index))
            .collect();
        assert_eq!(payload, vec![("q1", 1), ("q2", 0), ("q3", 2)]);
    }

    #[test]
    fn reanswering_never_double_counts() {
        let mut session = session(10);
        session.select_answer(&qid("q3"), 2).unwrap();

        for index in [1, 1, 0, 1, 2, 0, 0, 1] {
            session.select_answer(&qid("q1"), index).unwrap();
            let expected = 1 + u32::from(index == 1);
            assert_eq!(session.live_score(), expected, "after selecting {index}");
        }
        assert_eq!(session.live_score(), session.recompute_live_score());
    }

    #[test]
    fn correct_to_incorrect_decrements() {
        let mut session = session(10);
        session.select_answer(&qid("q1"), 1).unwrap();
        assert_eq!(session.live_score(), 1);
        session.select_answer(&qid("q1"), 0).unwrap();
        assert_eq!(session.live_score(), 0);
        assert_eq!(session.answer_for(&qid("q1")), Some(0));
    }

    #[test]
    fn rejects_unknown_question_and_out_of_range_option() {
        let mut session = session(10);
        assert_eq!(
            session.select_answer(&qid("nope"), 0),
            Err(AnswerError::UnknownQuestion(qid("nope")))
        );
        assert_eq!(
            session.select_answer(&qid("q1"), 3),
            Err(AnswerError::OptionOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(session.answered_count(), 0);
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut session = session(10);
        assert_eq!(session.navigate(Direction::Previous), 0);
        assert_eq!(session.navigate(Direction::Next), 1);
        assert_eq!(session.navigate(Direction::Next), 2);
        assert_eq!(session.navigate(Direction::Next), 2);
        assert_eq!(session.current_question().unwrap().id(), &qid("q3"));
        assert_eq!(session.navigate(Direction::Previous), 1);
    }

    #[test]
    fn payload_marks_unanswered_questions() {
        let mut session = session(10);
        session.select_answer(&qid("q2"), 2).unwrap();

        let submission = session.begin_submission().unwrap();
        assert_eq!(submission.len(), session.total_questions());
        let indices: Vec<_> = submission.answers.iter().map(|a| a.selected_index).collect();
        assert_eq!(indices, vec![UNANSWERED, 2, UNANSWERED]);
    }

    #[test]
    fn expiry_fires_once_after_full_duration() {
        let mut session = session(1);
        let mut expired = 0;
        for _ in 0..60 {
            if session.tick() == TickState::Expired {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
        assert!(session.expiry_fired());
        assert_eq!(session.tick(), TickState::Idle);
        assert_eq!(session.tick(), TickState::Idle);
        assert_eq!(session.remaining_seconds(), 0);
    }

    #[test]
    fn tick_reports_remaining_time() {
        let mut session = session(1);
        assert_eq!(session.tick(), TickState::Running { remaining_seconds: 59 });
        assert_eq!(session.countdown().display(), "00:59");
    }

    #[test]
    fn only_one_submission_slot() {
        let mut session = session(10);
        assert!(session.begin_submission().is_some());
        assert!(session.is_submitting());
        assert!(session.begin_submission().is_none());

        assert!(session.complete_submission(ResultId::new("r1"), fixed_now()));
        assert!(session.begin_submission().is_none());
        assert_eq!(session.result_id(), Some(&ResultId::new("r1")));
        assert_eq!(session.submitted_at(), Some(fixed_now()));
        assert!(!session.fail_submission());
    }

    #[test]
    fn failed_submission_reopens_with_answers_intact() {
        let mut session = session(10);
        session.select_answer(&qid("q1"), 1).unwrap();
        session.begin_submission().unwrap();

        assert!(session.fail_submission());
        assert_eq!(session.submission_state(), &SubmissionState::Open);
        assert_eq!(session.answer_for(&qid("q1")), Some(1));
        assert_eq!(session.live_score(), 1);
        assert!(session.begin_submission().is_some());
    }

    #[test]
    fn selections_are_ignored_once_closed() {
        let mut session = session(10);
        session.begin_submission().unwrap();
        assert_eq!(session.select_answer(&qid("q1"), 1), Ok(false));

        session.complete_submission(ResultId::new("r1"), fixed_now());
        assert_eq!(session.select_answer(&qid("q1"), 1), Ok(false));
        assert_eq!(session.answered_count(), 0);
        assert_eq!(session.tick(), TickState::Idle);
    }

    #[test]
    fn selections_are_ignored_after_time_runs_out() {
        let mut session = session(0);
        assert_eq!(session.tick(), TickState::Expired);
        assert_eq!(session.select_answer(&qid("q1"), 1), Ok(false));
    }

    #[test]
    fn all_answered_requires_every_question() {
        let mut session = session(10);
        session.select_answer(&qid("q1"), 0).unwrap();
        session.select_answer(&qid("q2"), 0).unwrap();
        assert!(!session.all_answered());
        session.select_answer(&qid("q3"), 0).unwrap();
        assert!(session.all_answered());

        let progress = session.progress();
        assert_eq!(progress.answered, 3);
        assert_eq!(progress.unanswered, 0);
        assert!(progress.all_answered);
    }
}
