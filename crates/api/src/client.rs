use async_trait::async_trait;
use prep_core::model::{ExamResult, GenerateRequest, Question, ResultId, Submission, TestId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by Exam API adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("response contains invalid data: {0}")]
    Invalid(#[from] prep_core::Error),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Question delivery and answer submission.
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// Fetch the ordered question set for a test.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failures or undecodable questions.
    async fn load_questions(&self, test_id: &TestId) -> Result<Vec<Question>, ApiError>;

    /// Submit final answers and return the id of the persisted result.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the submission is not accepted.
    async fn submit_answers(
        &self,
        test_id: &TestId,
        submission: &Submission,
    ) -> Result<ResultId, ApiError>;
}

#[async_trait]
pub trait ResultApi: Send + Sync {
    /// Fetch a scored result for review.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the result does not exist, or other API errors.
    async fn fetch_result(
        &self,
        test_id: &TestId,
        result_id: &ResultId,
    ) -> Result<ExamResult, ApiError>;
}

#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Ask the server to assemble a new test.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if generation fails or no test id comes back.
    async fn generate_test(&self, request: &GenerateRequest) -> Result<TestId, ApiError>;
}

/// Bundle of API handles handed to the services layer.
#[derive(Clone)]
pub struct Api {
    pub exams: Arc<dyn ExamApi>,
    pub results: Arc<dyn ResultApi>,
    pub generation: Arc<dyn GenerationApi>,
}

impl Api {
    #[must_use]
    pub fn in_memory(api: InMemoryExamApi) -> Self {
        Self {
            exams: Arc::new(api.clone()),
            results: Arc::new(api.clone()),
            generation: Arc::new(api),
        }
    }
}

//
// ─── IN-MEMORY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
struct Scripted {
    fail_loads: bool,
    submit_failures: usize,
    fail_generation: bool,
}

/// Scriptable in-memory Exam API for tests and offline demos.
///
/// Every submission attempt is recorded, including scripted failures.
#[derive(Clone, Default)]
pub struct InMemoryExamApi {
    tests: Arc<Mutex<HashMap<TestId, Vec<Question>>>>,
    results: Arc<Mutex<HashMap<(TestId, ResultId), ExamResult>>>,
    submissions: Arc<Mutex<Vec<(TestId, Submission)>>>,
    generated: Arc<Mutex<Vec<GenerateRequest>>>,
    scripted: Arc<Mutex<Scripted>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> ApiError {
    ApiError::Unavailable(e.to_string())
}

impl InMemoryExamApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the questions served for `test_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert_test(&self, test_id: TestId, questions: Vec<Question>) {
        self.tests
            .lock()
            .expect("tests lock")
            .insert(test_id, questions);
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert_result(&self, test_id: TestId, result_id: ResultId, result: ExamResult) {
        self.results
            .lock()
            .expect("results lock")
            .insert((test_id, result_id), result);
    }

    /// Make every question load fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_loads(&self, fail: bool) {
        self.scripted.lock().expect("script lock").fail_loads = fail;
    }

    /// Make the next `count` submissions fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_next_submits(&self, count: usize) {
        self.scripted.lock().expect("script lock").submit_failures = count;
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_generation(&self, fail: bool) {
        self.scripted.lock().expect("script lock").fail_generation = fail;
    }

    /// All submission attempts received so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn submissions(&self) -> Vec<(TestId, Submission)> {
        self.submissions.lock().expect("submissions lock").clone()
    }

    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions().len()
    }

    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn generated_requests(&self) -> Vec<GenerateRequest> {
        self.generated.lock().expect("generated lock").clone()
    }
}

#[async_trait]
impl ExamApi for InMemoryExamApi {
    async fn load_questions(&self, test_id: &TestId) -> Result<Vec<Question>, ApiError> {
        if self.scripted.lock().map_err(poisoned)?.fail_loads {
            return Err(ApiError::Unavailable("scripted load failure".into()));
        }
        let guard = self.tests.lock().map_err(poisoned)?;
        guard.get(test_id).cloned().ok_or(ApiError::NotFound)
    }

    async fn submit_answers(
        &self,
        test_id: &TestId,
        submission: &Submission,
    ) -> Result<ResultId, ApiError> {
        let attempt = {
            let mut guard = self.submissions.lock().map_err(poisoned)?;
            guard.push((test_id.clone(), submission.clone()));
            guard.len()
        };

        let mut scripted = self.scripted.lock().map_err(poisoned)?;
        if scripted.submit_failures > 0 {
            scripted.submit_failures -= 1;
            return Err(ApiError::Unavailable("scripted submit failure".into()));
        }
        drop(scripted);

        if !self.tests.lock().map_err(poisoned)?.contains_key(test_id) {
            return Err(ApiError::NotFound);
        }
        Ok(ResultId::new(format!("result-{attempt}")))
    }
}

#[async_trait]
impl ResultApi for InMemoryExamApi {
    async fn fetch_result(
        &self,
        test_id: &TestId,
        result_id: &ResultId,
    ) -> Result<ExamResult, ApiError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .get(&(test_id.clone(), result_id.clone()))
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}

#[async_trait]
impl GenerationApi for InMemoryExamApi {
    async fn generate_test(&self, request: &GenerateRequest) -> Result<TestId, ApiError> {
        if self.scripted.lock().map_err(poisoned)?.fail_generation {
            return Err(ApiError::Unavailable("scripted generation failure".into()));
        }
        let mut guard = self.generated.lock().map_err(poisoned)?;
        guard.push(request.clone());
        Ok(TestId::new(format!("test-{}", guard.len())))
    }
}
