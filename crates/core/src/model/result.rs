use crate::model::ids::QuestionId;

/// Subject label used when the server did not tag an item.
const GENERAL_SUBJECT: &str = "General";

/// Server-scored review of one answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub question_id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub user_index: i64,
    pub correct_index: i64,
    pub correct: bool,
    pub explanation: Option<String>,
    pub subject: Option<String>,
    pub topics: Vec<String>,
}

/// Correct/total counts for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectBreakdown {
    pub subject: String,
    pub correct: u32,
    pub total: u32,
}

/// Persisted result of a submitted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    /// Percentage score as computed by the server.
    pub score: u32,
    pub total: u32,
    pub items: Vec<ResultItem>,
}

impl ExamResult {
    /// Build a result, falling back to the item count when `total` is absent.
    #[must_use]
    pub fn new(score: u32, total: Option<u32>, items: Vec<ResultItem>) -> Self {
        let total = total
            .filter(|&total| total > 0)
            .unwrap_or_else(|| u32::try_from(items.len()).unwrap_or(u32::MAX));
        Self {
            score,
            total,
            items,
        }
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.items.iter().filter(|item| item.correct).count()
    }

    /// Per-subject tallies in order of first appearance.
    #[must_use]
    pub fn by_subject(&self) -> Vec<SubjectBreakdown> {
        let mut breakdown: Vec<SubjectBreakdown> = Vec::new();
        for item in &self.items {
            let subject = item
                .subject
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(GENERAL_SUBJECT);

            let entry = match breakdown.iter().position(|b| b.subject == subject) {
                Some(pos) => &mut breakdown[pos],
                None => {
                    breakdown.push(SubjectBreakdown {
                        subject: subject.to_owned(),
                        correct: 0,
                        total: 0,
                    });
                    let last = breakdown.len() - 1;
                    &mut breakdown[last]
                }
            };
            entry.total = entry.total.saturating_add(1);
            if item.correct {
                entry.correct = entry.correct.saturating_add(1);
            }
        }
        breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, subject: Option<&str>, correct: bool) -> ResultItem {
        ResultItem {
            question_id: QuestionId::new(id),
            prompt: format!("prompt {id}"),
            options: vec!["a".into(), "b".into()],
            user_index: if correct { 0 } else { 1 },
            correct_index: 0,
            correct,
            explanation: None,
            subject: subject.map(str::to_owned),
            topics: Vec::new(),
        }
    }

    #[test]
    fn groups_by_subject_in_first_seen_order() {
        let result = ExamResult::new(
            50,
            None,
            vec![
                item("1", Some("Physics"), true),
                item("2", None, false),
                item("3", Some("Physics"), false),
                item("4", Some(""), true),
            ],
        );

        assert_eq!(
            result.by_subject(),
            vec![
                SubjectBreakdown {
                    subject: "Physics".into(),
                    correct: 1,
                    total: 2,
                },
                SubjectBreakdown {
                    subject: "General".into(),
                    correct: 1,
                    total: 2,
                },
            ]
        );
        assert_eq!(result.correct_count(), 2);
    }

    #[test]
    fn total_falls_back_to_item_count() {
        let result = ExamResult::new(100, None, vec![item("1", None, true)]);
        assert_eq!(result.total, 1);

        let result = ExamResult::new(100, Some(40), vec![item("1", None, true)]);
        assert_eq!(result.total, 40);
    }
}
