//! REST-backed attempt service client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizmill_core::attempt::Attempt;
use quizmill_core::error::ServiceError;
use quizmill_core::model::{AnswerValue, Quiz};
use quizmill_core::report::ScoredResult;
use quizmill_core::traits::{AttemptCheckpoint, AttemptService};

use crate::config::ServiceConfig;

/// HTTP client for a remote attempt backend.
///
/// Endpoints:
/// - `GET  /quizzes/{id}`
/// - `POST /quizzes/{id}/attempts`
/// - `POST /attempts/{id}/submit`
/// - `PUT  /attempts/{id}/checkpoint`
pub struct HttpAttemptService {
    base_url: String,
    auth_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpAttemptService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.auth_token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.timeout_secs)
        } else {
            ServiceError::Network(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct StartAttemptRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    resume_attempt_id: Option<&'a str>,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    answers: &'a BTreeMap<String, AnswerValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_result: Option<&'a ScoredResult>,
}

#[derive(Deserialize)]
struct AttemptsExhaustedBody {
    attempts: u32,
    #[serde(default)]
    best: Option<ScoredResult>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Map a non-success response to the error taxonomy. Consumes the response
/// to read the body.
async fn error_for(status: u16, response: reqwest::Response, not_found: ServiceError) -> ServiceError {
    if status == 404 {
        return not_found;
    }
    let body = response.text().await.unwrap_or_default();
    if status == 409 {
        if let Ok(parsed) = serde_json::from_str::<AttemptsExhaustedBody>(&body) {
            return ServiceError::MaxAttemptsExceeded {
                attempts: parsed.attempts,
                best: parsed.best.map(Box::new),
            };
        }
    }
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    ServiceError::Api { status, message }
}

#[async_trait]
impl AttemptService for HttpAttemptService {
    #[instrument(skip(self))]
    async fn load_quiz(&self, quiz_id: &str) -> Result<Quiz, ServiceError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/quizzes/{quiz_id}"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(error_for(
                status,
                response,
                ServiceError::QuizNotFound(quiz_id.to_string()),
            )
            .await);
        }

        response.json().await.map_err(|e| ServiceError::Api {
            status,
            message: format!("failed to parse quiz: {e}"),
        })
    }

    #[instrument(skip(self))]
    async fn start_attempt(
        &self,
        quiz_id: &str,
        resume: Option<&str>,
    ) -> Result<Attempt, ServiceError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/quizzes/{quiz_id}/attempts"))
            .json(&StartAttemptRequest {
                resume_attempt_id: resume,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let not_found = match resume {
                Some(attempt_id) => ServiceError::AttemptNotFound(attempt_id.to_string()),
                None => ServiceError::QuizNotFound(quiz_id.to_string()),
            };
            return Err(error_for(status, response, not_found).await);
        }

        response.json().await.map_err(|e| ServiceError::Api {
            status,
            message: format!("failed to parse attempt: {e}"),
        })
    }

    #[instrument(skip(self, answers, hint))]
    async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &BTreeMap<String, AnswerValue>,
        hint: Option<&ScoredResult>,
    ) -> Result<ScoredResult, ServiceError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/attempts/{attempt_id}/submit"))
            .json(&SubmitRequest {
                answers,
                client_result: hint,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(error_for(
                status,
                response,
                ServiceError::AttemptNotFound(attempt_id.to_string()),
            )
            .await);
        }

        response.json().await.map_err(|e| ServiceError::Api {
            status,
            message: format!("failed to parse result: {e}"),
        })
    }

    #[instrument(skip(self, snapshot), fields(attempt_id = %snapshot.attempt_id))]
    async fn checkpoint(&self, snapshot: &AttemptCheckpoint) -> Result<(), ServiceError> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/attempts/{}/checkpoint", snapshot.attempt_id),
            )
            .json(snapshot)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(error_for(
                status,
                response,
                ServiceError::AttemptNotFound(snapshot.attempt_id.clone()),
            )
            .await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quizmill_core::model::{AnswerKey, Question, QuestionKind};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ServiceConfig {
        ServiceConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            auth_token: Some("token-123".into()),
        }
    }

    fn quiz_json() -> serde_json::Value {
        serde_json::to_value(Quiz {
            id: "geo-1".into(),
            title: "Geography".into(),
            description: String::new(),
            questions: vec![Question {
                id: "q1".into(),
                prompt: "Capital of France?".into(),
                kind: QuestionKind::SingleChoice,
                options: vec!["Paris".into(), "Lyon".into()],
                points: 1,
                key: AnswerKey::Single { index: 0 },
                explanation: None,
            }],
            time_limit_seconds: Some(300),
            passing_score_percent: 70,
            max_attempts: 3,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn loads_quiz_with_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quizzes/geo-1"))
            .and(header("authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quiz_json()))
            .mount(&server)
            .await;

        let service = HttpAttemptService::new(&config_for(&server)).unwrap();
        let quiz = service.load_quiz("geo-1").await.unwrap();
        assert_eq!(quiz.title, "Geography");
        assert_eq!(quiz.time_limit_seconds, Some(300));
    }

    #[tokio::test]
    async fn missing_quiz_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quizzes/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let service = HttpAttemptService::new(&config_for(&server)).unwrap();
        let err = service.load_quiz("ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::QuizNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn exhausted_attempts_carry_best_result() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "attempts": 3,
            "best": {
                "score_percent": 80,
                "passed": true,
                "correct_count": 4,
                "total_questions": 5,
                "time_spent_seconds": 120,
                "details": []
            }
        });
        Mock::given(method("POST"))
            .and(path("/quizzes/geo-1/attempts"))
            .respond_with(ResponseTemplate::new(409).set_body_json(body))
            .mount(&server)
            .await;

        let service = HttpAttemptService::new(&config_for(&server)).unwrap();
        let err = service.start_attempt("geo-1", None).await.unwrap_err();
        // 409 is a terminal outcome, not a transient failure.
        assert!(!err.is_retryable());
        match err {
            ServiceError::MaxAttemptsExceeded { attempts, best } => {
                assert_eq!(attempts, 3);
                assert_eq!(best.unwrap().score_percent, 80);
            }
            other => panic!("expected MaxAttemptsExceeded, got {other}"),
        }
    }

    #[tokio::test]
    async fn resume_id_travels_in_request_body() {
        let server = MockServer::start().await;
        let attempt = Attempt {
            id: "att-7".into(),
            quiz_id: "geo-1".into(),
            started_at: Utc::now(),
            answers: BTreeMap::new(),
            flagged: Default::default(),
            remaining_seconds: Some(240),
            submitted_at: None,
            status: quizmill_core::attempt::AttemptStatus::InProgress,
        };
        Mock::given(method("POST"))
            .and(path("/quizzes/geo-1/attempts"))
            .and(body_partial_json(
                serde_json::json!({"resume_attempt_id": "att-7"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(&attempt))
            .mount(&server)
            .await;

        let service = HttpAttemptService::new(&config_for(&server)).unwrap();
        let resumed = service.start_attempt("geo-1", Some("att-7")).await.unwrap();
        assert_eq!(resumed.id, "att-7");
        assert_eq!(resumed.remaining_seconds, Some(240));
    }

    #[tokio::test]
    async fn submit_returns_authoritative_result() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "score_percent": 100,
            "passed": true,
            "correct_count": 1,
            "total_questions": 1,
            "time_spent_seconds": 42,
            "details": []
        });
        Mock::given(method("POST"))
            .and(path("/attempts/att-7/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let service = HttpAttemptService::new(&config_for(&server)).unwrap();
        let mut answers = BTreeMap::new();
        answers.insert("q1".to_string(), AnswerValue::Single(0));
        let result = service.submit_attempt("att-7", &answers, None).await.unwrap();
        assert_eq!(result.score_percent, 100);
        assert_eq!(result.time_spent_seconds, 42);
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/attempts/att-7/submit"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let service = HttpAttemptService::new(&config_for(&server)).unwrap();
        let err = service
            .submit_attempt("att-7", &BTreeMap::new(), None)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ServiceError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn checkpoint_put_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/attempts/att-7/checkpoint"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let service = HttpAttemptService::new(&config_for(&server)).unwrap();
        let snapshot = AttemptCheckpoint {
            attempt_id: "att-7".into(),
            answers: BTreeMap::new(),
            remaining_seconds: Some(100),
        };
        service.checkpoint(&snapshot).await.unwrap();
    }
}
