//! Question navigation and per-question status badges.

use serde::Serialize;

use crate::attempt::AttemptState;
use crate::error::EngineError;

/// Status badge for a question position, in strict priority order:
/// `Current` overrides `Answered` overrides `Flagged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Current,
    Answered,
    Flagged,
    Unanswered,
}

/// Tracks the current question index with clamped movement and random access.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: usize,
    count: usize,
}

impl Navigator {
    /// Start at the first question of a quiz with `count` questions.
    pub fn new(count: usize) -> Self {
        debug_assert!(count > 0, "quizzes are validated non-empty");
        Self { current: 0, count }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.count
    }

    /// Move forward one question, clamping at the last (no wraparound).
    pub fn next(&mut self) -> usize {
        if self.current + 1 < self.count {
            self.current += 1;
        }
        self.current
    }

    /// Move back one question, clamping at the first.
    pub fn previous(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// Jump directly to any question.
    pub fn jump_to(&mut self, index: usize) -> Result<(), EngineError> {
        if index >= self.count {
            return Err(EngineError::IndexOutOfRange {
                index,
                count: self.count,
            });
        }
        self.current = index;
        Ok(())
    }

    /// Status badge for the question at `index`.
    pub fn status_of(&self, index: usize, state: &AttemptState) -> QuestionStatus {
        if index == self.current {
            return QuestionStatus::Current;
        }
        let Some(question) = state.quiz().questions.get(index) else {
            return QuestionStatus::Unanswered;
        };
        if state.answered(&question.id) {
            QuestionStatus::Answered
        } else if state.is_flagged(&question.id) {
            QuestionStatus::Flagged
        } else {
            QuestionStatus::Unanswered
        }
    }
}
