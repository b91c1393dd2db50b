//! Engine and boundary error types.
//!
//! `ServiceError` is defined here, next to the engine, so the session can
//! classify boundary failures for the host without string matching.

use thiserror::Error;

use crate::attempt::AttemptStatus;
use crate::model::ValidationIssue;
use crate::report::ScoredResult;

/// Errors raised by the engine itself.
///
/// Invariant violations (unknown question id, mutation after close) are
/// programmer errors and fail loudly; boundary failures are wrapped
/// `ServiceError`s for the host to recover from.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation referenced a question id that is not in the quiz.
    #[error("question '{0}' is not part of this quiz")]
    InvalidQuestion(String),

    /// A mutation was attempted after the attempt left `InProgress`.
    #[error("attempt is closed (status: {status})")]
    AttemptClosed { status: AttemptStatus },

    /// A navigation index outside `[0, count)`.
    #[error("question index {index} out of range (quiz has {count} questions)")]
    IndexOutOfRange { index: usize, count: usize },

    /// The quiz definition failed structural validation.
    #[error("invalid quiz definition ({} issues)", .0.len())]
    InvalidQuiz(Vec<ValidationIssue>),

    /// A failure at the external attempt-service boundary.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Errors from the external attempt service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested quiz does not exist.
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// The referenced attempt does not exist.
    #[error("attempt not found: {0}")]
    AttemptNotFound(String),

    /// All allowed attempts are already consumed. Carries the best prior
    /// result, if any, so the host can show it instead.
    #[error("maximum attempts ({attempts}) already used")]
    MaxAttemptsExceeded {
        attempts: u32,
        best: Option<Box<ScoredResult>>,
    },

    /// The service returned an error response.
    #[error("service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A transport-level failure.
    #[error("network error: {0}")]
    Network(String),
}

impl ServiceError {
    /// Returns `true` if the host may reasonably retry the call.
    ///
    /// The engine itself never retries; this is a hint for the host's
    /// recovery UI.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout(_)
                | ServiceError::Network(_)
                | ServiceError::Api { status: 500..=599, .. }
        )
    }
}
