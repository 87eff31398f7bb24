use std::sync::Arc;

use api::GenerationApi;
use prep_core::model::{ExamPlan, TestId};
use tracing::{info, warn};

use crate::error::GenerateError;

/// Turns a pre-exam plan into a server-generated test.
#[derive(Clone)]
pub struct ExamPlanService {
    generation: Arc<dyn GenerationApi>,
}

impl ExamPlanService {
    #[must_use]
    pub fn new(generation: Arc<dyn GenerationApi>) -> Self {
        Self { generation }
    }

    /// # Errors
    ///
    /// Returns `GenerateError::Api` if the server cannot generate the test.
    pub async fn generate(&self, plan: &ExamPlan) -> Result<TestId, GenerateError> {
        let request = plan.request();
        let test_id = self
            .generation
            .generate_test(&request)
            .await
            .inspect_err(|err| {
                warn!(subjects = ?plan.subjects(), error = %err, "test generation failed");
            })?;
        info!(
            %test_id,
            subjects = ?plan.subjects(),
            questions = plan.question_count(),
            "exam generated"
        );
        Ok(test_id)
    }
}
