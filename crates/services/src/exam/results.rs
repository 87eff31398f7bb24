use std::sync::Arc;

use api::ResultApi;
use prep_core::model::{ExamResult, ResultId, TestId};
use tracing::{info, warn};

use crate::error::ResultError;

/// Loads scored results for the review screen.
#[derive(Clone)]
pub struct ResultService {
    results: Arc<dyn ResultApi>,
}

impl ResultService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultApi>) -> Self {
        Self { results }
    }

    /// # Errors
    ///
    /// Returns `ResultError::Api` when the result cannot be fetched.
    pub async fn fetch(
        &self,
        test_id: &TestId,
        result_id: &ResultId,
    ) -> Result<ExamResult, ResultError> {
        let result = self
            .results
            .fetch_result(test_id, result_id)
            .await
            .inspect_err(|err| warn!(%test_id, %result_id, error = %err, "failed to load result"))?;
        info!(
            %test_id,
            %result_id,
            score = result.score,
            total = result.total,
            "result loaded"
        );
        Ok(result)
    }
}
