pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;
use crate::voice::relay;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Voice interviews
        .route(
            "/api/v1/interviews/voice",
            post(handlers::handle_start_voice_interview),
        )
        .route(
            "/api/v1/interviews/voice/:id/feedback",
            post(handlers::handle_save_voice_feedback),
        )
        // Quizzes
        .route("/api/v1/quiz", post(handlers::handle_generate_quiz))
        .route(
            "/api/v1/quiz/results",
            post(handlers::handle_save_quiz_result),
        )
        // Assessment reads
        .route(
            "/api/v1/assessments",
            get(handlers::handle_list_assessments),
        )
        .route(
            "/api/v1/assessments/stats",
            get(handlers::handle_assessment_stats),
        )
        .route(
            "/api/v1/assessments/:id",
            get(handlers::handle_get_assessment),
        )
        // Voice call relay
        .route("/api/v1/voice/sessions", post(relay::handle_start_session))
        .route(
            "/api/v1/voice/sessions/:id",
            get(relay::handle_session_status),
        )
        .route(
            "/api/v1/voice/sessions/:id/events",
            post(relay::handle_session_event),
        )
        .route(
            "/api/v1/voice/sessions/:id/stop",
            post(relay::handle_session_stop),
        )
        .route(
            "/api/v1/voice/sessions/:id/mute",
            post(relay::handle_session_mute),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::SUBJECT_HEADER;
    use crate::testing::Harness;
    use crate::voice::sdk::VoiceSettings;
    use crate::voice::VoiceSessions;

    const SUBJECT: &str = "user_http";

    fn app(h: &Harness) -> (Router, Arc<VoiceSessions>) {
        let voice = Arc::new(VoiceSessions::new(
            VoiceSettings {
                assistant_id: None,
                voice: "jennifer-playht".into(),
            },
            Duration::from_secs(1800),
        ));
        let state = AppState {
            interviewer: h.service.clone(),
            voice: voice.clone(),
        };
        (build_router(state), voice)
    }

    fn request(method: &str, uri: &str, subject: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(subject) = subject {
            builder = builder.header(SUBJECT_HEADER, subject);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn questions_json(n: usize) -> String {
        let items: Vec<Value> = (0..n)
            .map(|i| json!({"question": format!("Q{i}"), "followUp": format!("F{i}")}))
            .collect();
        json!({ "questions": items }).to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let h = Harness::new();
        let (router, _) = app(&h);
        let (status, body) = send(&router, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["activeVoiceSessions"], 0);
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let h = Harness::new();
        let (router, _) = app(&h);
        let (status, body) =
            send(&router, request("GET", "/api/v1/assessments", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_unknown_user_is_forbidden() {
        let h = Harness::new();
        let (router, _) = app(&h);
        let (status, body) = send(
            &router,
            request("GET", "/api/v1/assessments", Some("ghost"), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "User not found");
    }

    #[tokio::test]
    async fn test_voice_interview_over_http() {
        let h = Harness::new();
        h.store.add_user(SUBJECT, None, None);
        h.llm.push_ok(&questions_json(5));
        let (router, _) = app(&h);

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/v1/interviews/voice",
                Some(SUBJECT),
                Some(json!({"topic": "React"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"].as_array().unwrap().len(), 5);
        assert_eq!(body["questions"][0]["followUp"], "F0");
        let id = body["assessmentId"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            request(
                "POST",
                &format!("/api/v1/interviews/voice/{id}/feedback"),
                Some(SUBJECT),
                Some(json!({"transcript": []})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["assessmentId"], id.as_str());

        let (status, body) = send(
            &router,
            request("GET", &format!("/api/v1/assessments/{id}"), Some(SUBJECT), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "VOICE");
        assert_eq!(body["quizScore"], 0.0);

        let (status, body) = send(
            &router,
            request(
                "POST",
                &format!("/api/v1/interviews/voice/{id}/feedback"),
                Some(SUBJECT),
                Some(json!({"transcript": []})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_quiz_over_http() {
        let h = Harness::new();
        h.store.add_user(SUBJECT, None, Some("Software"));
        h.llm.push_ok(
            &json!({"questions": [
                {"question": "Q", "options": ["a", "b", "c", "d"], "correctAnswer": "a", "explanation": "e"}
            ]})
            .to_string(),
        );
        let (router, _) = app(&h);

        let (status, body) = send(&router, request("POST", "/api/v1/quiz", Some(SUBJECT), None)).await;
        assert_eq!(status, StatusCode::OK);
        let questions = body["questions"].clone();
        assert_eq!(questions.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/v1/quiz/results",
                Some(SUBJECT),
                Some(json!({"questions": questions, "answers": ["a"], "score": 100.0})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "Technical");
        assert_eq!(body["questions"][0]["isCorrect"], true);

        let (status, body) = send(
            &router,
            request("GET", "/api/v1/assessments/stats", Some(SUBJECT), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["quizAverage"], 100.0);
    }

    #[tokio::test]
    async fn test_quiz_generation_failure_is_reported() {
        let h = Harness::new();
        h.store.add_user(SUBJECT, None, None);
        let (router, _) = app(&h);
        let (status, body) = send(&router, request("POST", "/api/v1/quiz", Some(SUBJECT), None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "Failed to generate quiz questions");
    }

    #[tokio::test]
    async fn test_voice_relay_session_lifecycle() {
        let h = Harness::new();
        h.store.add_user(SUBJECT, None, None);
        h.llm.push_ok(&questions_json(2));
        let (router, voice) = app(&h);

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/v1/voice/sessions",
                Some(SUBJECT),
                Some(json!({"topic": "Rust"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "starting");
        assert_eq!(body["commands"][0]["command"], "start");
        assert_eq!(body["commands"][0]["config"]["mode"], "inlineModel");
        let session = body["sessionId"].as_str().unwrap().to_string();
        let assessment_id = body["assessmentId"].as_str().unwrap().to_string();
        let events = format!("/api/v1/voice/sessions/{session}/events");

        let (_, body) = send(
            &router,
            request("POST", &events, Some(SUBJECT), Some(json!({"event": "call-start"}))),
        )
        .await;
        assert_eq!(body["status"], "active");

        let (status, _) = send(
            &router,
            request("GET", &format!("/api/v1/voice/sessions/{session}"), Some("intruder"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(
            &router,
            request(
                "POST",
                &format!("/api/v1/voice/sessions/{session}/mute"),
                Some(SUBJECT),
                None,
            ),
        )
        .await;
        assert_eq!(body["muted"], true);
        assert_eq!(body["commands"][0]["command"], "setMuted");

        let (_, body) = send(
            &router,
            request(
                "POST",
                &events,
                Some(SUBJECT),
                Some(json!({"event": "message", "message": {
                    "type": "transcript", "role": "user", "transcript": "I like traits", "transcriptType": "final"
                }})),
            ),
        )
        .await;
        assert_eq!(body["currentMessage"]["message"], "I like traits");
        assert_eq!(body["transcriptLines"], 1);

        let (status, _) = send(
            &router,
            request("POST", &events, Some(SUBJECT), Some(json!({"event": "call-start"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(
            &router,
            request(
                "POST",
                &format!("/api/v1/voice/sessions/{session}/stop"),
                Some(SUBJECT),
                None,
            ),
        )
        .await;
        assert_eq!(body["commands"][0]["command"], "stop");

        h.llm.push_ok(r#"{"totalScore": 6, "finalAssessment": "Decent", "individualFeedback": []}"#);
        let (status, body) = send(
            &router,
            request("POST", &events, Some(SUBJECT), Some(json!({"event": "call-end"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "finished");
        assert_eq!(body["outcome"]["kind"], "redirect");
        assert_eq!(
            body["outcome"]["path"],
            format!("/interview/feedback/{assessment_id}")
        );
        assert_eq!(voice.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_voice_relay_error_closes_session() {
        let h = Harness::new();
        h.store.add_user(SUBJECT, None, None);
        h.llm.push_ok(&questions_json(1));
        let (router, voice) = app(&h);

        let (_, body) = send(
            &router,
            request("POST", "/api/v1/voice/sessions", Some(SUBJECT), None),
        )
        .await;
        let session = body["sessionId"].as_str().unwrap().to_string();
        assert_eq!(voice.active_count().await, 1);

        let (_, body) = send(
            &router,
            request(
                "POST",
                &format!("/api/v1/voice/sessions/{session}/events"),
                Some(SUBJECT),
                Some(json!({"event": "error", "message": "mic denied"})),
            ),
        )
        .await;
        assert_eq!(body["status"], "idle");
        assert_eq!(body["outcome"]["kind"], "failed");
        assert_eq!(voice.active_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_relay_session_expires() {
        let h = Harness::new();
        h.store.add_user(SUBJECT, None, None);
        h.llm.push_ok(&questions_json(1));
        let (router, voice) = app(&h);

        let (status, body) = send(
            &router,
            request("POST", "/api/v1/voice/sessions", Some(SUBJECT), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session = body["sessionId"].as_str().unwrap().to_string();
        assert_eq!(voice.active_count().await, 1);

        tokio::time::advance(Duration::from_secs(1800)).await;
        assert_eq!(voice.evict_expired().await, 1);
        assert_eq!(voice.active_count().await, 0);

        let (status, _) = send(
            &router,
            request("GET", &format!("/api/v1/voice/sessions/{session}"), Some(SUBJECT), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
