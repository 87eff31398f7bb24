use prep_core::model::{
    AnswerOption, ExamResult, Question, QuestionId, ResultId, ResultItem, TestId,
};
use serde::Deserialize;
use serde_json::Value;

use crate::client::ApiError;

//
// ─── WIRE SHAPES ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(crate) struct TestDto {
    #[serde(default)]
    pub questions: Vec<QuestionDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<OptionDto>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptionDto {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default, rename = "isCorrectAnswer")]
    pub is_correct_answer: Option<bool>,
}

impl OptionDto {
    fn marked_correct(&self) -> bool {
        self.correct.unwrap_or(false) || self.is_correct_answer.unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultDto {
    #[serde(default)]
    pub items: Vec<ResultItemDto>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultItemDto {
    #[serde(default)]
    pub question_id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<OptionDto>,
    #[serde(default = "unanswered")]
    pub user_index: i64,
    #[serde(default = "unanswered")]
    pub correct_index: i64,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

fn unanswered() -> i64 {
    prep_core::model::UNANSWERED
}

/// Identifier envelope; the server is inconsistent about the key it uses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct IdDto {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "_id")]
    pub underscore_id: Option<Value>,
    #[serde(default, rename = "resultId")]
    pub result_id: Option<Value>,
    #[serde(default, rename = "testId")]
    pub test_id: Option<Value>,
}

//
// ─── MAPPING ──────────────────────────────────────────────────────────────────
//

fn id_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn map_question(dto: QuestionDto) -> Result<Question, ApiError> {
    let options = dto
        .options
        .into_iter()
        .map(|option| {
            let correct = option.marked_correct();
            AnswerOption::new(option.text, correct)
        })
        .collect();
    Question::new(QuestionId::new(dto.id), dto.prompt, options, dto.explanation)
        .map_err(|e| ApiError::Invalid(e.into()))
}

pub(crate) fn map_questions(dto: TestDto) -> Result<Vec<Question>, ApiError> {
    dto.questions.into_iter().map(map_question).collect()
}

pub(crate) fn map_result(dto: ResultDto) -> ExamResult {
    let items = dto
        .items
        .into_iter()
        .map(|item| ResultItem {
            question_id: QuestionId::new(item.question_id),
            prompt: item.prompt,
            options: item.options.into_iter().map(|o| o.text).collect(),
            user_index: item.user_index,
            correct_index: item.correct_index,
            correct: item.correct,
            explanation: item.explanation.filter(|e| !e.trim().is_empty()),
            subject: item.subject,
            topics: item.topics,
        })
        .collect();

    // Percent; NaN saturates to zero in the cast.
    let score = dto.score.map_or(0, |s| s.round().clamp(0.0, 100.0) as u32);
    ExamResult::new(score, dto.total, items)
}

pub(crate) fn map_result_id(dto: &IdDto) -> Result<ResultId, ApiError> {
    [&dto.id, &dto.underscore_id, &dto.result_id]
        .into_iter()
        .find_map(|value| id_text(value.as_ref()))
        .map(ResultId::new)
        .ok_or(ApiError::MissingField("id"))
}

pub(crate) fn map_test_id(dto: &IdDto) -> Result<TestId, ApiError> {
    [&dto.underscore_id, &dto.id, &dto.test_id]
        .into_iter()
        .find_map(|value| id_text(value.as_ref()))
        .map(TestId::new)
        .ok_or(ApiError::MissingField("_id"))
}
