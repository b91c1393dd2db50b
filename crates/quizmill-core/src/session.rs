//! Session orchestrator: wires the attempt store, navigator, countdown, and
//! scoring into the single control flow the host drives.

use std::sync::Arc;

use chrono::Utc;

use crate::attempt::{Attempt, AttemptState, AttemptStatus};
use crate::error::EngineError;
use crate::model::{AnswerValue, Question, Quiz};
use crate::navigation::{Navigator, QuestionStatus};
use crate::report::ScoredResult;
use crate::scoring::grade;
use crate::timer::{Countdown, TimerState};
use crate::traits::{AttemptCheckpoint, AttemptService};

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    /// The countdown reached zero; a normal transition, never an error.
    TimerExpired,
}

/// One user's live run through a quiz.
///
/// The session exclusively owns its `Attempt`; resuming after a reload means
/// constructing a fresh session from the service's latest persisted state,
/// never merging two in-memory copies. All mutation goes through `&mut self`,
/// so answer writes, flags, navigation, and submission are serialized by the
/// host's event loop.
#[derive(Debug)]
pub struct QuizSession {
    state: AttemptState,
    nav: Navigator,
    countdown: Countdown,
    local_result: Option<ScoredResult>,
    authoritative_result: Option<ScoredResult>,
}

impl QuizSession {
    /// Load a quiz and start (or resume) an attempt on it.
    ///
    /// The countdown starts from the server-derived remaining time, never
    /// from anything cached on this client.
    pub async fn start(
        service: &dyn AttemptService,
        quiz_id: &str,
        resume: Option<&str>,
    ) -> Result<Self, EngineError> {
        let quiz = service.load_quiz(quiz_id).await?;
        crate::model::validate_quiz(&quiz).map_err(EngineError::InvalidQuiz)?;
        let quiz = Arc::new(quiz);

        let attempt = service.start_attempt(quiz_id, resume).await?;
        tracing::debug!(
            attempt_id = %attempt.id,
            resumed = resume.is_some(),
            remaining = ?attempt.remaining_seconds,
            "attempt started"
        );

        let countdown = match (quiz.is_timed(), attempt.remaining_seconds) {
            (true, Some(remaining)) => Countdown::start(remaining),
            (true, None) => Countdown::start(quiz.time_limit_seconds.unwrap_or(0)),
            (false, _) => Countdown::idle(),
        };

        let count = quiz.questions.len();
        Ok(Self {
            state: AttemptState::new(quiz, attempt),
            nav: Navigator::new(count),
            countdown,
            local_result: None,
            authoritative_result: None,
        })
    }

    // --- interaction, delegated to the store and navigator ---

    pub fn record_answer(
        &mut self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), EngineError> {
        self.state.record_answer(question_id, value)
    }

    pub fn toggle_flag(&mut self, question_id: &str) -> Result<bool, EngineError> {
        self.state.toggle_flag(question_id)
    }

    pub fn next(&mut self) -> usize {
        self.nav.next()
    }

    pub fn previous(&mut self) -> usize {
        self.nav.previous()
    }

    pub fn jump_to(&mut self, index: usize) -> Result<(), EngineError> {
        self.nav.jump_to(index)
    }

    pub fn current_index(&self) -> usize {
        self.nav.current()
    }

    pub fn is_last_question(&self) -> bool {
        self.nav.is_last()
    }

    pub fn current_question(&self) -> &Question {
        &self.state.quiz().questions[self.nav.current()]
    }

    pub fn question_status(&self, index: usize) -> QuestionStatus {
        self.nav.status_of(index, &self.state)
    }

    pub fn progress_fraction(&self) -> f64 {
        self.state.progress_fraction()
    }

    pub fn quiz(&self) -> &Quiz {
        self.state.quiz()
    }

    pub fn attempt(&self) -> &Attempt {
        self.state.attempt()
    }

    /// Display value for the countdown; `None` for untimed quizzes.
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    /// The graded result, once one exists (authoritative if synced).
    pub fn result(&self) -> Option<&ScoredResult> {
        self.authoritative_result
            .as_ref()
            .or(self.local_result.as_ref())
    }

    /// Resolves when the countdown expires. Pends forever for untimed
    /// quizzes, so the host can unconditionally `select!` on it.
    pub async fn expired(&self) {
        self.countdown.expired().await;
    }

    // --- submission ---

    /// Submit the attempt: freeze state, grade locally for instant display,
    /// then publish to the service and adopt its authoritative result.
    ///
    /// Idempotent: a duplicate call never re-grades. If the local grade
    /// exists but publishing failed, a retry re-publishes only.
    pub async fn submit(
        &mut self,
        service: &dyn AttemptService,
        trigger: SubmitTrigger,
    ) -> Result<ScoredResult, EngineError> {
        if let Some(result) = &self.authoritative_result {
            tracing::warn!(
                attempt_id = %self.state.attempt().id,
                "duplicate submit on graded attempt; returning existing result"
            );
            return Ok(result.clone());
        }

        if self.local_result.is_none() {
            let remaining = match self.countdown.state() {
                TimerState::Idle => None,
                // Expiry and submission can race; grade what the clock says.
                _ => self.countdown.remaining(),
            };
            self.state.close(remaining, Utc::now())?;
            self.countdown.stop();

            let result = grade(self.state.quiz(), self.state.attempt());
            self.state.mark_graded();
            tracing::info!(
                attempt_id = %self.state.attempt().id,
                ?trigger,
                score = result.score_percent,
                passed = result.passed,
                "attempt graded locally"
            );
            self.local_result = Some(result);
        } else {
            tracing::warn!(
                attempt_id = %self.state.attempt().id,
                "re-publishing an already graded attempt"
            );
        }

        let attempt = self.state.attempt();
        let authoritative = service
            .submit_attempt(&attempt.id, &attempt.answers, self.local_result.as_ref())
            .await?;
        self.authoritative_result = Some(authoritative.clone());
        Ok(authoritative)
    }

    /// Best-effort progress checkpoint; failures are logged, never surfaced.
    pub async fn checkpoint(&self, service: &dyn AttemptService) {
        if self.state.status() != AttemptStatus::InProgress {
            return;
        }
        let attempt = self.state.attempt();
        let snapshot = AttemptCheckpoint {
            attempt_id: attempt.id.clone(),
            answers: attempt.answers.clone(),
            remaining_seconds: self.countdown.remaining(),
        };
        if let Err(err) = service.checkpoint(&snapshot).await {
            tracing::warn!(attempt_id = %snapshot.attempt_id, %err, "checkpoint failed");
        }
    }
}
