//! Full engine-against-backend runs: sessions driven over the in-memory
//! system of record, covering grading, timing, and resume behavior.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use quizmill_core::model::{
    AnswerKey, AnswerValue, Question, QuestionKind, Quiz, TextMatcher,
};
use quizmill_core::navigation::QuestionStatus;
use quizmill_core::session::{QuizSession, SubmitTrigger};
use quizmill_service::MemoryAttemptService;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn three_question_quiz() -> Quiz {
    Quiz {
        id: "mixed-3".into(),
        title: "Mixed Quiz".into(),
        description: "One of each common kind".into(),
        questions: vec![
            Question {
                id: "q1".into(),
                prompt: "Which planet is known as the Red Planet?".into(),
                kind: QuestionKind::SingleChoice,
                options: vec!["Venus".into(), "Mars".into(), "Jupiter".into()],
                points: 1,
                key: AnswerKey::Single { index: 1 },
                explanation: None,
            },
            Question {
                id: "q2".into(),
                prompt: "Select the prime numbers.".into(),
                kind: QuestionKind::MultipleChoice,
                options: vec!["2".into(), "4".into(), "5".into(), "6".into()],
                points: 2,
                key: AnswerKey::Multiple {
                    indices: [0, 2].into_iter().collect(),
                },
                explanation: None,
            },
            Question {
                id: "q3".into(),
                prompt: "What gas do plants absorb?".into(),
                kind: QuestionKind::ShortAnswer,
                options: vec![],
                points: 1,
                key: AnswerKey::Text {
                    reference: "carbon dioxide".into(),
                    matcher: TextMatcher::Normalized,
                },
                explanation: None,
            },
        ],
        time_limit_seconds: None,
        passing_score_percent: 70,
        max_attempts: 3,
    }
}

/// A service whose wall clock only moves when the test says so.
fn service_with_clock() -> (MemoryAttemptService, Arc<AtomicI64>) {
    let offset = Arc::new(AtomicI64::new(0));
    let epoch: DateTime<Utc> = Utc::now();
    let handle = Arc::clone(&offset);
    let service = MemoryAttemptService::with_clock(move || {
        epoch + Duration::seconds(handle.load(Ordering::SeqCst))
    });
    (service, offset)
}

#[tokio::test]
async fn all_correct_answers_pass() {
    init_tracing();
    let service = MemoryAttemptService::new();
    service.register_quiz(three_question_quiz());

    let mut session = QuizSession::start(&service, "mixed-3", None).await.unwrap();
    session.record_answer("q1", AnswerValue::Single(1)).unwrap();
    session
        .record_answer("q2", AnswerValue::Multiple([0, 2].into_iter().collect()))
        .unwrap();
    session
        .record_answer("q3", AnswerValue::Text("  Carbon Dioxide ".into()))
        .unwrap();

    let result = session.submit(&service, SubmitTrigger::Manual).await.unwrap();
    assert_eq!(result.score_percent, 100);
    assert!(result.passed);
    assert_eq!(result.correct_count, 3);
    assert_eq!(result.total_questions, 3);
    assert!(result.details.iter().all(|d| d.is_correct));
}

#[tokio::test]
async fn two_of_three_rounds_to_67_and_fails_at_70() {
    init_tracing();
    let service = MemoryAttemptService::new();
    service.register_quiz(three_question_quiz());

    let mut session = QuizSession::start(&service, "mixed-3", None).await.unwrap();
    session.record_answer("q1", AnswerValue::Single(1)).unwrap();
    session
        .record_answer("q2", AnswerValue::Multiple([0, 2].into_iter().collect()))
        .unwrap();
    session
        .record_answer("q3", AnswerValue::Text("oxygen".into()))
        .unwrap();

    let result = session.submit(&service, SubmitTrigger::Manual).await.unwrap();
    assert_eq!(result.score_percent, 67);
    assert!(!result.passed);
}

#[tokio::test]
async fn multi_select_requires_the_exact_set() {
    init_tracing();
    let service = MemoryAttemptService::new();
    let mut quiz = three_question_quiz();
    quiz.max_attempts = 10;
    service.register_quiz(quiz);

    for (picked, expected) in [
        (vec![0, 2], true),
        (vec![0], false),          // subset
        (vec![0, 1, 2], false),    // superset
        (vec![1, 3], false),       // disjoint
    ] {
        let mut session = QuizSession::start(&service, "mixed-3", None).await.unwrap();
        session
            .record_answer(
                "q2",
                AnswerValue::Multiple(picked.iter().copied().collect()),
            )
            .unwrap();
        let result = session.submit(&service, SubmitTrigger::Manual).await.unwrap();
        let review = result
            .details
            .iter()
            .find(|d| d.question_id == "q2")
            .unwrap();
        assert_eq!(review.is_correct, expected, "picked {picked:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn timed_quiz_expires_and_auto_submits_once() {
    init_tracing();
    let (service, clock) = service_with_clock();
    let mut quiz = three_question_quiz();
    quiz.id = "timed-60".into();
    quiz.time_limit_seconds = Some(60);
    service.register_quiz(quiz);

    let mut session = QuizSession::start(&service, "timed-60", None).await.unwrap();
    assert_eq!(session.remaining_seconds(), Some(60));

    // Nothing answered; the host waits for expiry and submits.
    session.expired().await;
    assert_eq!(session.remaining_seconds(), Some(0));

    clock.store(60, Ordering::SeqCst);
    let result = session
        .submit(&service, SubmitTrigger::TimerExpired)
        .await
        .unwrap();
    assert_eq!(result.correct_count, 0);
    assert!(!result.passed);
    assert_eq!(result.time_spent_seconds, 60);

    // A stray manual submit after expiry is a no-op.
    let again = session.submit(&service, SubmitTrigger::Manual).await.unwrap();
    assert_eq!(result, again);
}

#[tokio::test]
async fn flagged_question_is_review_only_and_early_submit_counts_blanks_wrong() {
    init_tracing();
    let service = MemoryAttemptService::new();
    service.register_quiz(three_question_quiz());

    let mut session = QuizSession::start(&service, "mixed-3", None).await.unwrap();
    session.record_answer("q1", AnswerValue::Single(1)).unwrap();
    assert!(session.toggle_flag("q2").unwrap());
    session.next();
    assert_eq!(session.question_status(1), QuestionStatus::Current);
    session.previous();
    assert_eq!(session.question_status(1), QuestionStatus::Flagged);

    // Submit from question 1 of 3 with q2 and q3 blank.
    let result = session.submit(&service, SubmitTrigger::Manual).await.unwrap();
    assert_eq!(result.correct_count, 1);
    assert_eq!(result.score_percent, 33);
    assert!(result.details[1].user_answer.is_none());
    assert!(!result.details[1].is_correct);
}

#[tokio::test]
async fn duplicate_submission_does_not_change_the_grade() {
    init_tracing();
    let service = MemoryAttemptService::new();
    service.register_quiz(three_question_quiz());

    let mut session = QuizSession::start(&service, "mixed-3", None).await.unwrap();
    session.record_answer("q1", AnswerValue::Single(1)).unwrap();

    let first = session.submit(&service, SubmitTrigger::Manual).await.unwrap();
    let second = session.submit(&service, SubmitTrigger::Manual).await.unwrap();
    assert_eq!(first, second);

    // The backend holds the same grade: a fresh resume of the attempt still
    // submits into the stored result.
    let attempt_id = session.attempt().id.clone();
    let answers = session.attempt().answers.clone();
    use quizmill_core::traits::AttemptService;
    let stored = service
        .submit_attempt(&attempt_id, &answers, None)
        .await
        .unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
async fn resume_rederives_remaining_time_across_sessions() {
    init_tracing();
    let (service, clock) = service_with_clock();
    let mut quiz = three_question_quiz();
    quiz.id = "timed-300".into();
    quiz.time_limit_seconds = Some(300);
    service.register_quiz(quiz);

    let first = QuizSession::start(&service, "timed-300", None).await.unwrap();
    let attempt_id = first.attempt().id.clone();
    assert_eq!(first.attempt().remaining_seconds, Some(300));
    first.checkpoint(&service).await;
    drop(first);

    // Two minutes pass before the user reloads.
    clock.store(120, Ordering::SeqCst);
    let resumed = QuizSession::start(&service, "timed-300", Some(&attempt_id))
        .await
        .unwrap();
    assert_eq!(resumed.attempt().id, attempt_id);
    assert_eq!(resumed.attempt().remaining_seconds, Some(180));

    // A reload long after the deadline resumes with nothing left.
    clock.store(1000, Ordering::SeqCst);
    let expired = QuizSession::start(&service, "timed-300", Some(&attempt_id))
        .await
        .unwrap();
    assert_eq!(expired.attempt().remaining_seconds, Some(0));
}

#[tokio::test]
async fn checkpointed_answers_survive_a_reload() {
    init_tracing();
    let service = MemoryAttemptService::new();
    service.register_quiz(three_question_quiz());

    let mut session = QuizSession::start(&service, "mixed-3", None).await.unwrap();
    let attempt_id = session.attempt().id.clone();
    session.record_answer("q1", AnswerValue::Single(1)).unwrap();
    session
        .record_answer("q3", AnswerValue::Text("carbon dioxide".into()))
        .unwrap();
    session.checkpoint(&service).await;
    drop(session);

    let mut resumed = QuizSession::start(&service, "mixed-3", Some(&attempt_id))
        .await
        .unwrap();
    assert_eq!(resumed.attempt().answers.len(), 2);

    let result = resumed.submit(&service, SubmitTrigger::Manual).await.unwrap();
    assert_eq!(result.correct_count, 2);
}
