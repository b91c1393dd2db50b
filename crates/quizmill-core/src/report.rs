//! Scored results and the post-submission review view model.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerKey, AnswerValue};

/// The graded outcome of one attempt.
///
/// Derived, never stored by the engine; the external attempt service is the
/// system of record for persisted grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// 0–100, half-up rounded.
    pub score_percent: u8,
    pub passed: bool,
    pub correct_count: usize,
    pub total_questions: usize,
    pub time_spent_seconds: u64,
    /// Per-question breakdown in original question order.
    pub details: Vec<QuestionReview>,
}

/// One row of the per-question breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub prompt: String,
    /// Option labels, kept so the review can render indices as text.
    #[serde(default)]
    pub options: Vec<String>,
    /// What the user submitted; `None` for untouched questions.
    pub user_answer: Option<AnswerValue>,
    pub correct_answer: AnswerKey,
    pub is_correct: bool,
    pub points: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Pass/fail banner shown at the top of the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
}

/// Display-ready summary of a scored attempt.
///
/// Pure formatting over a `ScoredResult`; any discrepancy with the scoring
/// output is a defect here, not a design choice.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewViewModel {
    pub verdict: Verdict,
    pub score_percent: u8,
    /// e.g. "3 / 4 correct".
    pub summary: String,
    /// e.g. "12:05".
    pub time_spent: String,
    pub rows: Vec<ReviewRow>,
}

/// One formatted review row, in original question order.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    pub question_id: String,
    pub prompt: String,
    pub your_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub points: u32,
    pub explanation: Option<String>,
}

fn format_mm_ss(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

fn option_label(options: &[String], index: usize) -> String {
    options
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("option {index}"))
}

fn format_value(options: &[String], value: &AnswerValue) -> String {
    match value {
        AnswerValue::Single(index) => option_label(options, *index),
        AnswerValue::Multiple(indices) => indices
            .iter()
            .map(|i| option_label(options, *i))
            .collect::<Vec<_>>()
            .join(", "),
        AnswerValue::Text(text) => text.clone(),
    }
}

fn format_key(options: &[String], key: &AnswerKey) -> String {
    match key {
        AnswerKey::Single { index } => option_label(options, *index),
        AnswerKey::Multiple { indices } => indices
            .iter()
            .map(|i| option_label(options, *i))
            .collect::<Vec<_>>()
            .join(", "),
        AnswerKey::Text { reference, .. } => reference.clone(),
    }
}

impl ReviewViewModel {
    /// Build the review screen model from a scored result.
    pub fn from_result(result: &ScoredResult) -> Self {
        let rows = result
            .details
            .iter()
            .map(|d| ReviewRow {
                question_id: d.question_id.clone(),
                prompt: d.prompt.clone(),
                your_answer: d
                    .user_answer
                    .as_ref()
                    .map(|v| format_value(&d.options, v))
                    .unwrap_or_else(|| "(no answer)".to_string()),
                correct_answer: format_key(&d.options, &d.correct_answer),
                is_correct: d.is_correct,
                points: d.points,
                explanation: d.explanation.clone(),
            })
            .collect();

        Self {
            verdict: if result.passed {
                Verdict::Passed
            } else {
                Verdict::Failed
            },
            score_percent: result.score_percent,
            summary: format!(
                "{} / {} correct",
                result.correct_count, result.total_questions
            ),
            time_spent: format_mm_ss(result.time_spent_seconds),
            rows,
        }
    }
}
