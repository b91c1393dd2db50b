//! The boundary trait between the engine and the host's attempt backend.
//!
//! All network I/O lives behind `AttemptService`; the engine performs each
//! call at most once and reports failures to the host instead of retrying.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::attempt::Attempt;
use crate::error::ServiceError;
use crate::model::{AnswerValue, Quiz};
use crate::report::ScoredResult;

/// Low-frequency, best-effort progress snapshot for reload resilience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptCheckpoint {
    pub attempt_id: String,
    pub answers: BTreeMap<String, AnswerValue>,
    /// Advisory only; resuming always re-derives remaining time server-side.
    pub remaining_seconds: Option<u32>,
}

/// External attempt service: the system of record across sessions.
#[async_trait]
pub trait AttemptService: Send + Sync {
    /// Fetch a quiz definition by id.
    async fn load_quiz(&self, quiz_id: &str) -> Result<Quiz, ServiceError>;

    /// Start a new attempt, or resume an existing one.
    ///
    /// For timed quizzes the service computes `remaining_seconds` from the
    /// recorded `started_at` and the time limit; client-cached values are
    /// never trusted. Fails with `MaxAttemptsExceeded` once the quiz's
    /// attempt budget is used up.
    async fn start_attempt(
        &self,
        quiz_id: &str,
        resume: Option<&str>,
    ) -> Result<Attempt, ServiceError>;

    /// Submit final answers for grading.
    ///
    /// The service re-grades independently (it may accept `hint` as-is) and
    /// returns the authoritative result, which the engine renders even when
    /// it disagrees with the local computation.
    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &BTreeMap<String, AnswerValue>,
        hint: Option<&ScoredResult>,
    ) -> Result<ScoredResult, ServiceError>;

    /// Persist a progress checkpoint. Best-effort; callers log and move on.
    async fn checkpoint(&self, snapshot: &AttemptCheckpoint) -> Result<(), ServiceError>;
}
