//! Pure grading: `(Quiz, Attempt) -> ScoredResult`.
//!
//! No side effects, no I/O, no clock reads; identical inputs grade to
//! byte-identical results, which makes the grading call retry-safe.

use crate::attempt::Attempt;
use crate::model::{AnswerKey, AnswerValue, Question, Quiz};
use crate::report::{QuestionReview, ScoredResult};

/// Whether `submitted` is a correct answer for `question`.
///
/// A missing answer is always incorrect, as is a submitted value whose shape
/// does not match the question kind (a free-text value on a choice question
/// can only come from a confused client and must never score).
pub fn is_correct(question: &Question, submitted: Option<&AnswerValue>) -> bool {
    let Some(submitted) = submitted else {
        return false;
    };
    match (&question.key, submitted) {
        (AnswerKey::Single { index }, AnswerValue::Single(chosen)) => index == chosen,
        (AnswerKey::Multiple { indices }, AnswerValue::Multiple(chosen)) => indices == chosen,
        (AnswerKey::Text { reference, matcher }, AnswerValue::Text(text)) => {
            matcher.matches(reference, text)
        }
        _ => false,
    }
}

/// Round `100 * correct / total` to the nearest integer, 0.5 up.
///
/// Pass/fail hinges on this value, so the rounding mode is part of the
/// contract: 2 of 3 correct is 67, not 66.
fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // Integer half-up rounding; avoids float edge cases near .5.
    ((200 * correct + total) / (2 * total)) as u8
}

fn time_spent_seconds(quiz: &Quiz, attempt: &Attempt) -> u64 {
    match quiz.time_limit_seconds {
        Some(limit) => u64::from(limit.saturating_sub(attempt.remaining_seconds.unwrap_or(0))),
        None => attempt
            .submitted_at
            .map(|at| (at - attempt.started_at).num_seconds().max(0) as u64)
            .unwrap_or(0),
    }
}

/// Grade an attempt against its quiz.
///
/// Flags never influence the outcome; unanswered questions contribute zero.
pub fn grade(quiz: &Quiz, attempt: &Attempt) -> ScoredResult {
    let mut correct_count = 0usize;
    let details: Vec<QuestionReview> = quiz
        .questions
        .iter()
        .map(|question| {
            let submitted = attempt.answers.get(&question.id);
            let correct = is_correct(question, submitted);
            if correct {
                correct_count += 1;
            }
            QuestionReview {
                question_id: question.id.clone(),
                prompt: question.prompt.clone(),
                options: question.options.clone(),
                user_answer: submitted.cloned(),
                correct_answer: question.key.clone(),
                is_correct: correct,
                points: question.points,
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let total_questions = quiz.questions.len();
    let percent = score_percent(correct_count, total_questions);

    ScoredResult {
        score_percent: percent,
        passed: percent >= quiz.passing_score_percent,
        correct_count,
        total_questions,
        time_spent_seconds: time_spent_seconds(quiz, attempt),
        details,
    }
}
