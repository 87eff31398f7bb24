use serde::Serialize;

/// Questions requested for a freshly generated exam.
pub const DEFAULT_QUESTION_COUNT: u32 = 100;
/// One minute per question.
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 100;

const DEFAULT_SUBJECT: &str = "Mathematics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExamType {
    #[default]
    #[serde(rename = "JAMB")]
    Jamb,
}

/// Generation request body sent to the Exam API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenerateRequest {
    #[serde(rename_all = "camelCase")]
    Combined {
        subjects: Vec<String>,
        per_subject: u32,
        exam_type: ExamType,
    },
    #[serde(rename_all = "camelCase")]
    Single {
        subject: String,
        count: u32,
        exam_type: ExamType,
    },
}

/// What the learner chose before starting an exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamPlan {
    subjects: Vec<String>,
    question_count: u32,
    time_limit_minutes: u32,
    exam_type: ExamType,
}

impl ExamPlan {
    /// Parse a comma-separated subject list. An empty list falls back to
    /// a single default subject.
    #[must_use]
    pub fn from_subject_list(raw: &str) -> Self {
        let subjects: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Self::new(subjects)
    }

    #[must_use]
    pub fn new(subjects: Vec<String>) -> Self {
        let subjects = if subjects.is_empty() {
            vec![DEFAULT_SUBJECT.to_owned()]
        } else {
            subjects
        };
        Self {
            subjects,
            question_count: DEFAULT_QUESTION_COUNT,
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
            exam_type: ExamType::default(),
        }
    }

    #[must_use]
    pub fn with_question_count(mut self, count: u32) -> Self {
        self.question_count = count;
        self
    }

    #[must_use]
    pub fn with_time_limit_minutes(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = minutes;
        self
    }

    #[must_use]
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    /// Questions drawn from each subject of a combined exam (rounded down).
    #[must_use]
    pub fn per_subject(&self) -> u32 {
        let len = u32::try_from(self.subjects.len()).unwrap_or(u32::MAX).max(1);
        self.question_count / len
    }

    #[must_use]
    pub fn request(&self) -> GenerateRequest {
        match self.subjects.as_slice() {
            [single] => GenerateRequest::Single {
                subject: single.clone(),
                count: self.question_count,
                exam_type: self.exam_type,
            },
            subjects => GenerateRequest::Combined {
                subjects: subjects.to_vec(),
                per_subject: self.per_subject(),
                exam_type: self.exam_type,
            },
        }
    }
}
