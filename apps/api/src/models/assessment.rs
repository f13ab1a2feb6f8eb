use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "assessment_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentType {
    Quiz,
    Voice,
}

/// A generated voice-interview question with its follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    pub question: String,
    pub follow_up: String,
}

/// A generated multiple-choice quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// A graded quiz question as stored on the assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question: String,
    /// The correct answer.
    pub answer: String,
    pub user_answer: Option<String>,
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: String,
}

/// Stored question list entry. Quiz results carry grading, voice questions don't.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssessmentQuestion {
    Quiz(QuestionResult),
    Interview(InterviewQuestion),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    pub question: String,
    pub answer: String,
    pub feedback: String,
    pub score: f64,
}

/// Structured feedback for a completed voice interview. Scores are out of 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceFeedback {
    pub total_score: f64,
    pub final_assessment: String,
    #[serde(default)]
    pub individual_feedback: Vec<QuestionFeedback>,
}

impl VoiceFeedback {
    /// A zero-score feedback object carrying only a summary line.
    pub fn empty(final_assessment: impl Into<String>) -> Self {
        Self {
            total_score: 0.0,
            final_assessment: final_assessment.into(),
            individual_feedback: vec![],
        }
    }
}

/// One quiz or voice-interview attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    pub category: String,
    pub questions: Json<Vec<AssessmentQuestion>>,
    pub quiz_score: f64,
    pub improvement_tip: Option<String>,
    pub transcript: Json<Vec<TranscriptMessage>>,
    pub feedback: Option<Json<VoiceFeedback>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assessment {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Insert payload. Transcript starts empty and feedback absent.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub user_id: Uuid,
    pub assessment_type: AssessmentType,
    pub category: String,
    pub questions: Vec<AssessmentQuestion>,
    pub quiz_score: f64,
    pub improvement_tip: Option<String>,
    /// Quizzes are complete on creation; voice interviews are not.
    pub completed: bool,
}

/// Partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct AssessmentUpdate {
    pub transcript: Option<Vec<TranscriptMessage>>,
    pub feedback: Option<VoiceFeedback>,
    pub quiz_score: Option<f64>,
    pub improvement_tip: Option<String>,
    pub mark_completed: bool,
}
