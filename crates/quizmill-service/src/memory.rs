//! In-memory attempt service for tests and single-process hosts.
//!
//! Behaves like the real backend: it is the system of record, enforces the
//! attempt budget, re-derives remaining time from the recorded start time,
//! and re-grades submissions itself instead of trusting the client hint.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quizmill_core::attempt::{Attempt, AttemptStatus};
use quizmill_core::error::ServiceError;
use quizmill_core::model::{AnswerValue, Quiz};
use quizmill_core::report::ScoredResult;
use quizmill_core::scoring::grade;
use quizmill_core::traits::{AttemptCheckpoint, AttemptService};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Default)]
struct Inner {
    quizzes: HashMap<String, Quiz>,
    attempts: HashMap<String, AttemptRecord>,
    started_per_quiz: HashMap<String, u32>,
    best_per_quiz: HashMap<String, ScoredResult>,
}

struct AttemptRecord {
    attempt: Attempt,
    result: Option<ScoredResult>,
}

/// An `AttemptService` backed by mutexed maps.
///
/// The clock is injectable so resume/expiry behavior can be tested against
/// controlled wall-clock movement.
pub struct MemoryAttemptService {
    inner: Mutex<Inner>,
    clock: Clock,
}

impl MemoryAttemptService {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock: Arc::new(clock),
        }
    }

    /// Make a quiz available for loading and attempts.
    pub fn register_quiz(&self, quiz: Quiz) {
        let mut inner = self.inner.lock().unwrap();
        inner.quizzes.insert(quiz.id.clone(), quiz);
    }

    /// Server-side remaining time: limit minus elapsed since start, floored
    /// at zero. Never derived from anything the client sent.
    fn derive_remaining(quiz: &Quiz, attempt: &Attempt, now: DateTime<Utc>) -> Option<u32> {
        let limit = quiz.time_limit_seconds?;
        let elapsed = (now - attempt.started_at).num_seconds().max(0) as u64;
        Some(u64::from(limit).saturating_sub(elapsed) as u32)
    }
}

impl Default for MemoryAttemptService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttemptService for MemoryAttemptService {
    async fn load_quiz(&self, quiz_id: &str) -> Result<Quiz, ServiceError> {
        let inner = self.inner.lock().unwrap();
        inner
            .quizzes
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| ServiceError::QuizNotFound(quiz_id.to_string()))
    }

    async fn start_attempt(
        &self,
        quiz_id: &str,
        resume: Option<&str>,
    ) -> Result<Attempt, ServiceError> {
        let now = (self.clock)();
        let mut inner = self.inner.lock().unwrap();
        let quiz = inner
            .quizzes
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| ServiceError::QuizNotFound(quiz_id.to_string()))?;

        if let Some(attempt_id) = resume {
            let record = inner
                .attempts
                .get_mut(attempt_id)
                .ok_or_else(|| ServiceError::AttemptNotFound(attempt_id.to_string()))?;
            record.attempt.remaining_seconds =
                Self::derive_remaining(&quiz, &record.attempt, now);
            tracing::debug!(
                attempt_id,
                remaining = ?record.attempt.remaining_seconds,
                "attempt resumed"
            );
            return Ok(record.attempt.clone());
        }

        let started = inner.started_per_quiz.entry(quiz_id.to_string()).or_insert(0);
        if *started >= quiz.max_attempts {
            return Err(ServiceError::MaxAttemptsExceeded {
                attempts: quiz.max_attempts,
                best: inner.best_per_quiz.get(quiz_id).cloned().map(Box::new),
            });
        }
        *started += 1;

        let attempt = Attempt::new(Uuid::new_v4().to_string(), &quiz, now);
        inner.attempts.insert(
            attempt.id.clone(),
            AttemptRecord {
                attempt: attempt.clone(),
                result: None,
            },
        );
        Ok(attempt)
    }

    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &BTreeMap<String, AnswerValue>,
        hint: Option<&ScoredResult>,
    ) -> Result<ScoredResult, ServiceError> {
        let now = (self.clock)();
        let mut inner = self.inner.lock().unwrap();

        let quiz_id = {
            let record = inner
                .attempts
                .get(attempt_id)
                .ok_or_else(|| ServiceError::AttemptNotFound(attempt_id.to_string()))?;
            if let Some(result) = &record.result {
                // Duplicate submission: the stored grade stands.
                return Ok(result.clone());
            }
            record.attempt.quiz_id.clone()
        };
        let quiz = inner
            .quizzes
            .get(&quiz_id)
            .cloned()
            .ok_or_else(|| ServiceError::QuizNotFound(quiz_id.clone()))?;

        let record = inner
            .attempts
            .get_mut(attempt_id)
            .ok_or_else(|| ServiceError::AttemptNotFound(attempt_id.to_string()))?;
        record.attempt.answers = answers.clone();
        record.attempt.remaining_seconds = Self::derive_remaining(&quiz, &record.attempt, now);
        record.attempt.submitted_at = Some(now);
        record.attempt.status = AttemptStatus::Graded;

        let result = grade(&quiz, &record.attempt);
        if let Some(hint) = hint {
            if hint.score_percent != result.score_percent {
                tracing::debug!(
                    attempt_id,
                    client = hint.score_percent,
                    server = result.score_percent,
                    "client grading hint disagrees with server grade"
                );
            }
        }
        record.result = Some(result.clone());

        let best = inner.best_per_quiz.entry(quiz_id).or_insert_with(|| result.clone());
        if result.score_percent > best.score_percent {
            *best = result.clone();
        }
        Ok(result)
    }

    async fn checkpoint(&self, snapshot: &AttemptCheckpoint) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .attempts
            .get_mut(&snapshot.attempt_id)
            .ok_or_else(|| ServiceError::AttemptNotFound(snapshot.attempt_id.clone()))?;
        if record.attempt.status == AttemptStatus::InProgress {
            record.attempt.answers = snapshot.answers.clone();
        }
        Ok(())
    }
}
