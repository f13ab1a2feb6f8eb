//! Axum route handlers for interviews, quizzes and assessment reads.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::interview::service::{AssessmentStats, VoiceInterviewStarted};
use crate::models::assessment::{Assessment, QuizQuestion, TranscriptMessage};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartVoiceInterviewRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveFeedbackRequest {
    #[serde(default)]
    pub transcript: Vec<TranscriptMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFeedbackResponse {
    pub success: bool,
    pub assessment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct SaveQuizResultRequest {
    pub questions: Vec<QuizQuestion>,
    /// One entry per question, `null` when unanswered.
    pub answers: Vec<Option<String>>,
    pub score: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews/voice
///
/// Generates questions and opens an in-progress voice assessment.
pub async fn handle_start_voice_interview(
    State(state): State<AppState>,
    caller: Caller,
    request: Option<Json<StartVoiceInterviewRequest>>,
) -> Result<Json<VoiceInterviewStarted>, AppError> {
    let topic = request.and_then(|Json(r)| r.topic);
    let started = state
        .interviewer
        .start_voice_interview(caller.subject(), topic.as_deref())
        .await?;
    Ok(Json(started))
}

/// POST /api/v1/interviews/voice/:id/feedback
pub async fn handle_save_voice_feedback(
    State(state): State<AppState>,
    caller: Caller,
    Path(assessment_id): Path<Uuid>,
    Json(request): Json<SaveFeedbackRequest>,
) -> Result<Json<SaveFeedbackResponse>, AppError> {
    let assessment_id = state
        .interviewer
        .save_voice_interview_feedback(caller.subject(), assessment_id, request.transcript)
        .await?;
    Ok(Json(SaveFeedbackResponse {
        success: true,
        assessment_id,
    }))
}

/// POST /api/v1/quiz
///
/// Generates a fresh quiz. Nothing is stored until results are submitted.
pub async fn handle_generate_quiz(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<QuizResponse>, AppError> {
    let questions = state.interviewer.generate_quiz(caller.subject()).await?;
    Ok(Json(QuizResponse { questions }))
}

/// POST /api/v1/quiz/results
pub async fn handle_save_quiz_result(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<SaveQuizResultRequest>,
) -> Result<Json<Assessment>, AppError> {
    if request.questions.is_empty() {
        return Err(AppError::Validation(
            "questions cannot be empty".to_string(),
        ));
    }
    let assessment = state
        .interviewer
        .save_quiz_result(
            caller.subject(),
            request.questions,
            request.answers,
            request.score,
        )
        .await?;
    Ok(Json(assessment))
}

/// GET /api/v1/assessments
pub async fn handle_list_assessments(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Assessment>>, AppError> {
    Ok(Json(
        state.interviewer.get_assessments(caller.subject()).await?,
    ))
}

/// GET /api/v1/assessments/stats
pub async fn handle_assessment_stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<AssessmentStats>, AppError> {
    Ok(Json(
        state.interviewer.assessment_stats(caller.subject()).await?,
    ))
}

/// GET /api/v1/assessments/:id
pub async fn handle_get_assessment(
    State(state): State<AppState>,
    caller: Caller,
    Path(assessment_id): Path<Uuid>,
) -> Result<Json<Assessment>, AppError> {
    Ok(Json(
        state
            .interviewer
            .get_assessment(caller.subject(), assessment_id)
            .await?,
    ))
}
