use std::sync::Arc;

use api::{ApiError, ExamApi};
use prep_core::model::{QuestionSet, ResultId, Submission, TestId};
use tracing::{error, info, warn};

use super::session::{ExamSession, TickState};
use crate::Clock;
use crate::error::{LoadError, SubmitError};

/// Used when the caller does not pass a duration.
pub const DEFAULT_DURATION_MINUTES: u32 = 100;

/// Who asked for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Expiry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { result_id: ResultId },
    /// Another submission is in flight or already went through.
    Skipped,
}

#[derive(Debug)]
pub enum TickOutcome {
    Running { remaining_seconds: u32 },
    Submitted { result_id: ResultId },
    /// The expiry submission failed. The attempt is over and the learner
    /// goes back to the landing screen.
    Abandoned(SubmitError),
    Idle,
}

/// A claimed submission whose network call has not been made yet.
///
/// Owns everything the call needs, so hosts can spawn `send` while they keep
/// handling ticks and input.
pub struct PendingSubmission {
    exams: Arc<dyn ExamApi>,
    test_id: TestId,
    submission: Submission,
    trigger: SubmitTrigger,
}

impl PendingSubmission {
    #[must_use]
    pub fn trigger(&self) -> SubmitTrigger {
        self.trigger
    }

    #[must_use]
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// Perform the network call.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` of the Exam API.
    pub async fn send(self) -> Result<ResultId, ApiError> {
        self.exams
            .submit_answers(&self.test_id, &self.submission)
            .await
    }
}

/// Orchestrates exam start, submission and the expiry path.
#[derive(Clone)]
pub struct ExamLoopService {
    clock: Clock,
    exams: Arc<dyn ExamApi>,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(clock: Clock, exams: Arc<dyn ExamApi>) -> Self {
        Self { clock, exams }
    }

    /// Load the questions for `test_id` and start the countdown state.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Api` when the fetch fails and
    /// `LoadError::Questions` for an empty or inconsistent question set.
    pub async fn start_exam(
        &self,
        test_id: TestId,
        duration_minutes: Option<u32>,
    ) -> Result<ExamSession, LoadError> {
        let duration_minutes = duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        let questions = match self.exams.load_questions(&test_id).await {
            Ok(questions) => questions,
            Err(err) => {
                warn!(%test_id, error = %err, "failed to load test");
                return Err(err.into());
            }
        };
        let questions = QuestionSet::new(questions).inspect_err(|err| {
            warn!(%test_id, error = %err, "unusable question set");
        })?;

        info!(
            %test_id,
            questions = questions.len(),
            duration_minutes,
            "exam session started"
        );
        Ok(ExamSession::new(
            test_id,
            questions,
            duration_minutes,
            self.clock.now(),
        ))
    }

    /// Claim the submission slot. `None` means a submission is already in
    /// flight or done, and nothing must be sent.
    pub fn prepare_submission(
        &self,
        session: &mut ExamSession,
        trigger: SubmitTrigger,
    ) -> Option<PendingSubmission> {
        let Some(submission) = session.begin_submission() else {
            info!(test_id = %session.test_id(), ?trigger, "submission skipped");
            return None;
        };
        info!(
            test_id = %session.test_id(),
            ?trigger,
            answered = submission.answered_count(),
            total = submission.len(),
            elapsed_seconds = session.countdown().elapsed_seconds(),
            time_limit_seconds = session.countdown().total_seconds(),
            "submitting answers"
        );
        Some(PendingSubmission {
            exams: Arc::clone(&self.exams),
            test_id: session.test_id().clone(),
            submission,
            trigger,
        })
    }

    /// Apply the outcome of a sent submission to the session.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` when the API rejected the submission. The
    /// session is reopened so a manual retry loses no answers.
    pub fn finish_submission(
        &self,
        session: &mut ExamSession,
        trigger: SubmitTrigger,
        outcome: Result<ResultId, ApiError>,
    ) -> Result<SubmitOutcome, SubmitError> {
        match outcome {
            Ok(result_id) => {
                session.complete_submission(result_id.clone(), self.clock.now());
                info!(test_id = %session.test_id(), %result_id, ?trigger, "answers submitted");
                Ok(SubmitOutcome::Submitted { result_id })
            }
            Err(err) => {
                session.fail_submission();
                match trigger {
                    SubmitTrigger::Manual => {
                        warn!(test_id = %session.test_id(), error = %err, "submit failed");
                    }
                    SubmitTrigger::Expiry => {
                        error!(
                            test_id = %session.test_id(),
                            error = %err,
                            "submit after time expiry failed, abandoning attempt"
                        );
                    }
                }
                Err(err.into())
            }
        }
    }

    /// Submit the attempt and wait for the result id.
    ///
    /// Idempotent: returns `SubmitOutcome::Skipped` if a submission is in
    /// flight or already accepted.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` if the Exam API rejects the submission.
    pub async fn submit(
        &self,
        session: &mut ExamSession,
        trigger: SubmitTrigger,
    ) -> Result<SubmitOutcome, SubmitError> {
        let Some(pending) = self.prepare_submission(session, trigger) else {
            return Ok(SubmitOutcome::Skipped);
        };
        let outcome = pending.send().await;
        self.finish_submission(session, trigger, outcome)
    }

    /// Apply one countdown tick, force-submitting when time runs out.
    pub async fn tick(&self, session: &mut ExamSession) -> TickOutcome {
        match session.tick() {
            TickState::Running { remaining_seconds } => TickOutcome::Running { remaining_seconds },
            TickState::Idle => TickOutcome::Idle,
            TickState::Expired => match self.submit(session, SubmitTrigger::Expiry).await {
                Ok(SubmitOutcome::Submitted { result_id }) => TickOutcome::Submitted { result_id },
                Ok(SubmitOutcome::Skipped) => TickOutcome::Idle,
                Err(err) => TickOutcome::Abandoned(err),
            },
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use api::InMemoryExamApi;
    use prep_core::model::{AnswerOption, Question, QuestionId, QuestionSetError, UNANSWERED};
    use prep_core::time::{fixed_clock, fixed_now};

    fn question(id: &str, correct: usize) -> Question {
        let options = (0..4)
            .map(|i| AnswerOption::new(format!("option {i}"), i == correct))
            .collect();
        Question::new(QuestionId::new(id), "prompt", options, None).unwrap()
    }

    fn setup() -> (InMemoryExamApi, ExamLoopService) {
        let api = InMemoryExamApi::new();
        api.insert_test(
            TestId::new("t1"),
            vec![question("q1", 1), question("q2", 0), question("q3", 2)],
        );
        let service = ExamLoopService::new(fixed_clock(), Arc::new(api.clone()));
        (api, service)
    }

    #[tokio::test]
    async fn start_uses_default_duration() {
        let (_api, service) = setup();
        let session = service.start_exam(TestId::new("t1"), None).await.unwrap();
        assert_eq!(session.remaining_seconds(), DEFAULT_DURATION_MINUTES * 60);
        assert_eq!(session.started_at(), fixed_now());
        assert_eq!(session.total_questions(), 3);
    }

    #[tokio::test]
    async fn load_failures_surface_as_load_error() {
        let (api, service) = setup();

        let err = service.start_exam(TestId::new("missing"), Some(5)).await.unwrap_err();
        assert!(matches!(err, LoadError::Api(ApiError::NotFound)));

        api.insert_test(TestId::new("empty"), Vec::new());
        let err = service.start_exam(TestId::new("empty"), Some(5)).await.unwrap_err();
        assert!(matches!(err, LoadError::Questions(QuestionSetError::Empty)));

        api.insert_test(TestId::new("dup"), vec![question("q1", 0), question("q1", 1)]);
        let err = service.start_exam(TestId::new("dup"), Some(5)).await.unwrap_err();
        assert!(matches!(err, LoadError::Questions(QuestionSetError::DuplicateId(_))));

        api.fail_loads(true);
        let err = service.start_exam(TestId::new("t1"), Some(5)).await.unwrap_err();
        assert!(matches!(err, LoadError::Api(ApiError::Unavailable(_))));
    }

    #[tokio::test]
    async fn manual_submit_sends_once() {
        let (api, service) = setup();
        let mut session = service.start_exam(TestId::new("t1"), Some(5)).await.unwrap();
        session.select_answer(&QuestionId::new("q1"), 1).unwrap();

        let first = service.submit(&mut session, SubmitTrigger::Manual).await.unwrap();
        let second = service.submit(&mut session, SubmitTrigger::Manual).await.unwrap();

        assert_eq!(
            first,
            SubmitOutcome::Submitted {
                result_id: ResultId::new("result-1")
            }
        );
        assert_eq!(second, SubmitOutcome::Skipped);
        assert_eq!(api.submission_count(), 1);
        assert!(session.is_submitted());
    }

    #[tokio::test]
    async fn expiry_racing_manual_submit_sends_once() {
        let (api, service) = setup();
        let mut session = service.start_exam(TestId::new("t1"), Some(0)).await.unwrap();

        // Manual tap claims the slot; expiry lands while the call is in flight.
        let pending = service
            .prepare_submission(&mut session, SubmitTrigger::Manual)
            .unwrap();
        assert!(matches!(service.tick(&mut session).await, TickOutcome::Idle));

        let outcome = pending.send().await;
        let outcome = service
            .finish_submission(&mut session, SubmitTrigger::Manual, outcome)
            .unwrap();

        assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));
        assert!(matches!(service.tick(&mut session).await, TickOutcome::Idle));
        assert_eq!(api.submission_count(), 1);
    }

    #[tokio::test]
    async fn full_countdown_submits_exactly_once() {
        let (api, service) = setup();
        let mut session = service.start_exam(TestId::new("t1"), Some(1)).await.unwrap();

        let mut submitted = Vec::new();
        for _ in 0..60 {
            if let TickOutcome::Submitted { result_id } = service.tick(&mut session).await {
                submitted.push(result_id);
            }
        }
        for _ in 0..5 {
            assert!(matches!(service.tick(&mut session).await, TickOutcome::Idle));
        }

        assert_eq!(submitted.len(), 1);
        let submissions = api.submissions();
        assert_eq!(submissions.len(), 1);
        let (test_id, submission) = &submissions[0];
        assert_eq!(test_id, &TestId::new("t1"));
        assert_eq!(submission.len(), 3);
        assert!(submission.answers.iter().all(|a| a.selected_index == UNANSWERED));
    }

    #[tokio::test]
    async fn failed_manual_submit_can_be_retried() {
        let (api, service) = setup();
        let mut session = service.start_exam(TestId::new("t1"), Some(5)).await.unwrap();
        session.select_answer(&QuestionId::new("q2"), 0).unwrap();
        api.fail_next_submits(1);

        let err = service.submit(&mut session, SubmitTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, SubmitError::Api(ApiError::Unavailable(_))));
        assert!(!session.is_submitted());
        assert_eq!(session.answer_for(&QuestionId::new("q2")), Some(0));

        let retry = service.submit(&mut session, SubmitTrigger::Manual).await.unwrap();
        assert!(matches!(retry, SubmitOutcome::Submitted { .. }));
        assert_eq!(api.submission_count(), 2);
    }

    #[tokio::test]
    async fn failed_expiry_submit_abandons_without_retrying() {
        let (api, service) = setup();
        let mut session = service.start_exam(TestId::new("t1"), Some(0)).await.unwrap();
        api.fail_next_submits(1);

        let outcome = service.tick(&mut session).await;
        assert!(matches!(outcome, TickOutcome::Abandoned(SubmitError::Api(_))));
        assert!(!session.is_submitted());

        for _ in 0..3 {
            assert!(matches!(service.tick(&mut session).await, TickOutcome::Idle));
        }
        assert_eq!(api.submission_count(), 1);
    }
}
