//! In-memory attempt state: the single source of truth for an in-progress run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{AnswerValue, Quiz};

/// Lifecycle of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Graded,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::InProgress => write!(f, "in_progress"),
            AttemptStatus::Submitted => write!(f, "submitted"),
            AttemptStatus::Graded => write!(f, "graded"),
        }
    }
}

/// One user's run through a quiz, as exchanged with the attempt service.
///
/// `answers` and `flagged` use ordered collections so snapshots serialize
/// deterministically; grading the same attempt twice is byte-identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub quiz_id: String,
    pub started_at: DateTime<Utc>,
    /// Submitted values, keyed by question id; keys exist only for questions
    /// the user has touched.
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerValue>,
    /// Question ids marked for later review. Never read by scoring.
    #[serde(default)]
    pub flagged: BTreeSet<String>,
    /// Present only for timed quizzes; non-increasing while active.
    #[serde(default)]
    pub remaining_seconds: Option<u32>,
    /// Set when the attempt is submitted; used for untimed elapsed time.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
}

impl Attempt {
    /// A fresh in-progress attempt for the given quiz.
    pub fn new(id: impl Into<String>, quiz: &Quiz, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            quiz_id: quiz.id.clone(),
            started_at,
            answers: BTreeMap::new(),
            flagged: BTreeSet::new(),
            remaining_seconds: quiz.time_limit_seconds,
            submitted_at: None,
            status: AttemptStatus::InProgress,
        }
    }
}

/// Mutable attempt store owned by exactly one session.
///
/// Every answer and flag mutation funnels through here; operations on ids
/// outside the quiz or after close are rejected rather than ignored.
#[derive(Debug)]
pub struct AttemptState {
    quiz: Arc<Quiz>,
    attempt: Attempt,
}

impl AttemptState {
    /// Wrap a service-loaded attempt. Prior answers from a resumed attempt
    /// are the initial state and are never discarded.
    pub fn new(quiz: Arc<Quiz>, attempt: Attempt) -> Self {
        Self { quiz, attempt }
    }

    fn guard(&self, question_id: &str) -> Result<(), EngineError> {
        if self.attempt.status != AttemptStatus::InProgress {
            return Err(EngineError::AttemptClosed {
                status: self.attempt.status,
            });
        }
        if self.quiz.question(question_id).is_none() {
            return Err(EngineError::InvalidQuestion(question_id.to_string()));
        }
        Ok(())
    }

    /// Record (or overwrite) the answer for a question.
    ///
    /// No shape validation happens here; partial short-answer text can be
    /// saved incrementally and is only validated at grading time.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), EngineError> {
        self.guard(question_id)?;
        self.attempt.answers.insert(question_id.to_string(), value);
        Ok(())
    }

    /// Toggle the review flag on a question. Returns the new flagged state.
    pub fn toggle_flag(&mut self, question_id: &str) -> Result<bool, EngineError> {
        self.guard(question_id)?;
        if self.attempt.flagged.remove(question_id) {
            Ok(false)
        } else {
            self.attempt.flagged.insert(question_id.to_string());
            Ok(true)
        }
    }

    /// Fraction of questions with a recorded answer, regardless of correctness.
    pub fn progress_fraction(&self) -> f64 {
        self.attempt.answers.len() as f64 / self.quiz.questions.len() as f64
    }

    pub fn answered(&self, question_id: &str) -> bool {
        self.attempt.answers.contains_key(question_id)
    }

    pub fn is_flagged(&self, question_id: &str) -> bool {
        self.attempt.flagged.contains(question_id)
    }

    pub fn status(&self) -> AttemptStatus {
        self.attempt.status
    }

    pub fn quiz(&self) -> &Arc<Quiz> {
        &self.quiz
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    /// Owned copy of the current attempt, for checkpoints and submission.
    pub fn snapshot(&self) -> Attempt {
        self.attempt.clone()
    }

    /// Freeze the attempt for grading. Called once from the submission path.
    pub(crate) fn close(
        &mut self,
        remaining_seconds: Option<u32>,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if self.attempt.status != AttemptStatus::InProgress {
            return Err(EngineError::AttemptClosed {
                status: self.attempt.status,
            });
        }
        self.attempt.remaining_seconds = remaining_seconds;
        self.attempt.submitted_at = Some(submitted_at);
        self.attempt.status = AttemptStatus::Submitted;
        Ok(())
    }

    pub(crate) fn mark_graded(&mut self) {
        self.attempt.status = AttemptStatus::Graded;
    }
}
