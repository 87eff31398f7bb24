use async_trait::async_trait;
use prep_core::model::{ExamResult, GenerateRequest, Question, ResultId, Submission, TestId};
use tracing::info;

use super::HttpExamApi;
use super::mapping::{IdDto, ResultDto, TestDto, map_questions, map_result, map_result_id, map_test_id};
use crate::client::{ApiError, ExamApi, GenerationApi, ResultApi};

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn load_questions(&self, test_id: &TestId) -> Result<Vec<Question>, ApiError> {
        let url = self.endpoint(&["api", "tests", test_id.as_str()])?;
        let dto: TestDto = self.get_json(url).await?;
        map_questions(dto)
    }

    async fn submit_answers(
        &self,
        test_id: &TestId,
        submission: &Submission,
    ) -> Result<ResultId, ApiError> {
        let url = self.endpoint(&["api", "tests", test_id.as_str(), "submit"])?;
        let dto: IdDto = self.post_json(url, submission).await?;
        map_result_id(&dto)
    }
}

#[async_trait]
impl ResultApi for HttpExamApi {
    async fn fetch_result(
        &self,
        test_id: &TestId,
        result_id: &ResultId,
    ) -> Result<ExamResult, ApiError> {
        let url = self.endpoint(&[
            "api",
            "tests",
            test_id.as_str(),
            "results",
            result_id.as_str(),
        ])?;
        let dto: ResultDto = self.get_json(url).await?;
        Ok(map_result(dto))
    }
}

#[async_trait]
impl GenerationApi for HttpExamApi {
    async fn generate_test(&self, request: &GenerateRequest) -> Result<TestId, ApiError> {
        let path = match request {
            GenerateRequest::Combined { .. } => "generate",
            GenerateRequest::Single { .. } => "generate-single",
        };
        let url = self.endpoint(&["api", "tests", path])?;
        let dto: IdDto = self.post_json(url, request).await?;
        let test_id = map_test_id(&dto)?;
        info!(%test_id, "test generated");
        Ok(test_id)
    }
}
