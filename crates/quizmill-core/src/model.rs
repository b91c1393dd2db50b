//! Core data model types for quizmill.
//!
//! These are the fundamental types that the entire quizmill system uses
//! to represent quizzes, questions, answer keys, and submitted answers.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::SingleChoice => write!(f, "single_choice"),
            QuestionKind::MultipleChoice => write!(f, "multiple_choice"),
            QuestionKind::TrueFalse => write!(f, "true_false"),
            QuestionKind::ShortAnswer => write!(f, "short_answer"),
        }
    }
}

/// Matching policy for short-answer reference text.
///
/// The trimmed, case-insensitive `Normalized` policy is the default contract;
/// authors can tighten or widen it per question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TextMatcher {
    /// Trimmed, case-insensitive equality.
    #[default]
    Normalized,
    /// Byte-for-byte equality.
    Verbatim,
    /// Normalized equality against any of several accepted strings.
    OneOf { accepted: Vec<String> },
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

impl TextMatcher {
    /// Check a submitted string against the reference answer under this policy.
    pub fn matches(&self, reference: &str, submitted: &str) -> bool {
        match self {
            TextMatcher::Normalized => normalize(reference) == normalize(submitted),
            TextMatcher::Verbatim => reference == submitted,
            TextMatcher::OneOf { accepted } => {
                let submitted = normalize(submitted);
                accepted.iter().any(|a| normalize(a) == submitted)
                    || normalize(reference) == submitted
            }
        }
    }
}

/// The correct answer for a question, shaped by its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
    /// Option index, for `SingleChoice` and `TrueFalse`.
    Single { index: usize },
    /// Set of option indices, for `MultipleChoice`.
    Multiple { indices: BTreeSet<usize> },
    /// Reference text plus matching policy, for `ShortAnswer`.
    Text {
        reference: String,
        #[serde(default)]
        matcher: TextMatcher,
    },
}

/// A value submitted by the user for one question.
///
/// Tagged so the scoring engine can handle each shape exhaustively; a value
/// whose shape does not match the question's kind simply grades incorrect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Single(usize),
    Multiple(BTreeSet<usize>),
    Text(String),
}

/// A single question within a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the quiz.
    pub id: String,
    /// The question text shown to the user.
    pub prompt: String,
    /// What shape of answer this question takes.
    pub kind: QuestionKind,
    /// Ordered option labels; empty for `ShortAnswer`.
    #[serde(default)]
    pub options: Vec<String>,
    /// Positive point weight.
    pub points: u32,
    /// The answer key, shaped by `kind`.
    pub key: AnswerKey,
    /// Optional explanation shown during review.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// An ordered quiz definition.
///
/// Question order is significant and fixed for the lifetime of an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
    /// `None` means untimed.
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
    /// Minimum score percent required to pass, 0–100.
    pub passing_score_percent: u8,
    /// How many attempts a user may make.
    pub max_attempts: u32,
}

impl Quiz {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Whether this quiz has a time limit.
    pub fn is_timed(&self) -> bool {
        self.time_limit_seconds.is_some()
    }
}

/// A problem found while validating a quiz definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub issue: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.issue)
    }
}

/// Validate a quiz definition against the structural invariants.
pub fn validate_quiz(quiz: &Quiz) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut push = |field: String, issue: &str| {
        issues.push(ValidationIssue {
            field,
            issue: issue.into(),
        });
    };

    if quiz.title.trim().is_empty() {
        push("title".into(), "must not be empty");
    }
    if quiz.questions.is_empty() {
        push("questions".into(), "must contain at least one question");
    }
    if quiz.passing_score_percent > 100 {
        push("passing_score_percent".into(), "must be at most 100");
    }
    if quiz.max_attempts == 0 {
        push("max_attempts".into(), "must be at least 1");
    }

    let mut seen_ids = HashSet::new();
    for (i, q) in quiz.questions.iter().enumerate() {
        if q.id.trim().is_empty() {
            push(format!("questions[{i}].id"), "must not be empty");
        }
        if !seen_ids.insert(q.id.as_str()) {
            push(format!("questions[{i}].id"), "must be unique");
        }
        if q.prompt.trim().is_empty() {
            push(format!("questions[{i}].prompt"), "must not be empty");
        }
        if q.points == 0 {
            push(format!("questions[{i}].points"), "must be at least 1");
        }

        match q.kind {
            QuestionKind::ShortAnswer => {
                if !q.options.is_empty() {
                    push(
                        format!("questions[{i}].options"),
                        "must be empty for short-answer questions",
                    );
                }
                match &q.key {
                    AnswerKey::Text { reference, .. } => {
                        if reference.trim().is_empty() {
                            push(format!("questions[{i}].key.reference"), "must not be empty");
                        }
                    }
                    _ => push(
                        format!("questions[{i}].key"),
                        "must be a text key for short-answer questions",
                    ),
                }
            }
            QuestionKind::SingleChoice | QuestionKind::TrueFalse => {
                if q.options.is_empty() {
                    push(format!("questions[{i}].options"), "must not be empty");
                }
                match &q.key {
                    AnswerKey::Single { index } => {
                        if *index >= q.options.len() {
                            push(
                                format!("questions[{i}].key.index"),
                                "must reference an existing option",
                            );
                        }
                    }
                    _ => push(
                        format!("questions[{i}].key"),
                        "must be a single index for this question kind",
                    ),
                }
            }
            QuestionKind::MultipleChoice => {
                if q.options.is_empty() {
                    push(format!("questions[{i}].options"), "must not be empty");
                }
                match &q.key {
                    AnswerKey::Multiple { indices } => {
                        if indices.is_empty() {
                            push(format!("questions[{i}].key.indices"), "must not be empty");
                        }
                        for idx in indices {
                            if *idx >= q.options.len() {
                                push(
                                    format!("questions[{i}].key.indices"),
                                    "must reference existing options",
                                );
                                break;
                            }
                        }
                    }
                    _ => push(
                        format!("questions[{i}].key"),
                        "must be an index set for multiple-choice questions",
                    ),
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
