//! Assessment orchestration actions.
//!
//! Every action resolves the caller, then sequences generation, persistence,
//! notification and cache invalidation. The sub-steps are independent calls:
//! nothing is transactional across them and nothing is retried.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::{assessments_key, CacheStore};
use crate::errors::AppError;
use crate::interview::generator::{
    generate_feedback, generate_improvement_tip, generate_interview_questions,
    generate_quiz_questions,
};
use crate::llm_client::TextGenerator;
use crate::models::assessment::{
    Assessment, AssessmentQuestion, AssessmentType, AssessmentUpdate, InterviewQuestion,
    NewAssessment, QuestionResult, QuizQuestion, TranscriptMessage, VoiceFeedback,
};
use crate::models::user::User;
use crate::notify::templates::{quiz_result_email, voice_feedback_email};
use crate::notify::Notifier;
use crate::store::AssessmentStore;

pub const DEFAULT_TOPIC: &str = "General";
pub const INTERVIEW_LEVEL: &str = "Mid-level";
pub const QUIZ_CATEGORY: &str = "Technical";
pub const IN_PROGRESS_TIP: &str = "Interview in progress...";
pub const EMPTY_TRANSCRIPT_MESSAGE: &str = "Interview ended before any conversation was recorded.";
/// How many earlier questions on the same topic are sent as "do not repeat".
const MAX_PREVIOUS_QUESTIONS: usize = 20;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Public web app URL for links in emails.
    pub app_url: String,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInterviewStarted {
    pub assessment_id: Uuid,
    pub questions: Vec<InterviewQuestion>,
}

/// Aggregates over a user's completed assessments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStats {
    pub total: usize,
    pub in_progress: usize,
    /// Plain mean of every completed score. Quiz scores are percentages
    /// (0-100) and voice scores are out of 10, so with both kinds present
    /// this is not on either scale; use `quiz_average` / `voice_average`
    /// for comparisons.
    pub average_score: f64,
    pub quiz_count: usize,
    pub quiz_average: f64,
    pub voice_count: usize,
    pub voice_average: f64,
    pub latest_score: Option<f64>,
}

impl AssessmentStats {
    pub fn from_assessments(assessments: &[Assessment]) -> Self {
        let completed: Vec<&Assessment> = assessments.iter().filter(|a| a.is_completed()).collect();
        let scores_of = |kind: AssessmentType| -> Vec<f64> {
            completed
                .iter()
                .filter(|a| a.assessment_type == kind)
                .map(|a| a.quiz_score)
                .collect()
        };
        let quiz_scores = scores_of(AssessmentType::Quiz);
        let voice_scores = scores_of(AssessmentType::Voice);
        let all_scores: Vec<f64> = completed.iter().map(|a| a.quiz_score).collect();

        Self {
            total: completed.len(),
            in_progress: assessments.len() - completed.len(),
            average_score: mean(&all_scores),
            quiz_count: quiz_scores.len(),
            quiz_average: mean(&quiz_scores),
            voice_count: voice_scores.len(),
            voice_average: mean(&voice_scores),
            latest_score: completed
                .iter()
                .max_by_key(|a| a.created_at)
                .map(|a| a.quiz_score),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Grades submitted answers by exact string equality with the correct answer.
/// A missing answer is incorrect.
pub fn grade_quiz(questions: &[QuizQuestion], answers: &[Option<String>]) -> Vec<QuestionResult> {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let user_answer = answers.get(i).cloned().flatten();
            QuestionResult {
                question: q.question.clone(),
                answer: q.correct_answer.clone(),
                is_correct: user_answer.as_deref() == Some(q.correct_answer.as_str()),
                user_answer,
                explanation: q.explanation.clone(),
            }
        })
        .collect()
}

/// The orchestration layer. Constructed once per process and shared via `AppState`.
pub struct InterviewService {
    store: Arc<dyn AssessmentStore>,
    cache: Arc<dyn CacheStore>,
    llm: Arc<dyn TextGenerator>,
    notifier: Arc<dyn Notifier>,
    settings: ServiceSettings,
}

impl InterviewService {
    pub fn new(
        store: Arc<dyn AssessmentStore>,
        cache: Arc<dyn CacheStore>,
        llm: Arc<dyn TextGenerator>,
        notifier: Arc<dyn Notifier>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            cache,
            llm,
            notifier,
            settings,
        }
    }

    async fn resolve_user(&self, subject: &str) -> Result<User, AppError> {
        self.store
            .find_user(subject)
            .await?
            .ok_or_else(|| AppError::Forbidden("User not found".to_string()))
    }

    async fn invalidate(&self, subject: &str) -> Result<(), AppError> {
        self.cache.del(&assessments_key(subject)).await?;
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Voice interviews
    // ────────────────────────────────────────────────────────────────────────

    /// Generates questions and creates an in-progress VOICE assessment.
    pub async fn start_voice_interview(
        &self,
        subject: &str,
        topic: Option<&str>,
    ) -> Result<VoiceInterviewStarted, AppError> {
        let user = self.resolve_user(subject).await?;

        let topic = topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or(user.industry.as_deref())
            .unwrap_or(DEFAULT_TOPIC)
            .to_string();

        let previous = self.previous_questions(&user, &topic).await?;
        let questions =
            generate_interview_questions(self.llm.as_ref(), &topic, INTERVIEW_LEVEL, &previous)
                .await;
        if questions.is_empty() {
            return Err(AppError::ActionFailed(
                "Failed to generate interview questions.".to_string(),
            ));
        }

        let assessment = self
            .store
            .create_assessment(NewAssessment {
                user_id: user.id,
                assessment_type: AssessmentType::Voice,
                category: topic.clone(),
                questions: questions
                    .iter()
                    .cloned()
                    .map(AssessmentQuestion::Interview)
                    .collect(),
                quiz_score: 0.0,
                improvement_tip: Some(IN_PROGRESS_TIP.to_string()),
                completed: false,
            })
            .await?;

        self.invalidate(subject).await?;

        info!(
            "Started voice interview {} on {:?} for {}",
            assessment.id, topic, subject
        );

        Ok(VoiceInterviewStarted {
            assessment_id: assessment.id,
            questions,
        })
    }

    /// Questions already asked in this user's earlier interviews on the same topic.
    async fn previous_questions(&self, user: &User, topic: &str) -> Result<Vec<String>, AppError> {
        let history = self.store.list_assessments(user.id).await?;
        let asked: Vec<String> = history
            .iter()
            .filter(|a| {
                a.assessment_type == AssessmentType::Voice && a.category.eq_ignore_ascii_case(topic)
            })
            .flat_map(|a| a.questions.0.iter())
            .filter_map(|q| match q {
                AssessmentQuestion::Interview(q) => Some(q.question.clone()),
                AssessmentQuestion::Quiz(_) => None,
            })
            .collect();
        let skip = asked.len().saturating_sub(MAX_PREVIOUS_QUESTIONS);
        Ok(asked[skip..].to_vec())
    }

    /// Completes a VOICE assessment with the transcript and generated feedback.
    ///
    /// Failures after the ownership checks trigger a best-effort write that
    /// records the failure reason on the assessment. Losing the completion to
    /// a concurrent call is a plain `Conflict` and writes nothing more.
    pub async fn save_voice_interview_feedback(
        &self,
        subject: &str,
        assessment_id: Uuid,
        transcript: Vec<TranscriptMessage>,
    ) -> Result<Uuid, AppError> {
        let user = self.resolve_user(subject).await?;
        let assessment = self
            .store
            .find_assessment(assessment_id, user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assessment {assessment_id} not found")))?;

        if assessment.assessment_type != AssessmentType::Voice {
            return Err(AppError::Validation(format!(
                "Assessment {assessment_id} is not a voice interview"
            )));
        }
        if assessment.is_completed() {
            return Err(AppError::Conflict(format!(
                "Assessment {assessment_id} already has feedback"
            )));
        }

        match self
            .complete_voice_interview(subject, &user, assessment_id, &transcript)
            .await
        {
            Ok(id) => Ok(id),
            // Another call completed it first; its result stands.
            Err(e @ AppError::Conflict(_)) => {
                warn!("Assessment {assessment_id} was completed concurrently");
                Err(e)
            }
            Err(e) => {
                error!("Error saving feedback for assessment {assessment_id}: {e}");
                let reason = e.client_message();
                self.record_feedback_failure(subject, assessment_id, transcript, &reason)
                    .await;
                Err(AppError::ActionFailed(format!(
                    "Failed to save feedback: {reason}"
                )))
            }
        }
    }

    async fn complete_voice_interview(
        &self,
        subject: &str,
        user: &User,
        assessment_id: Uuid,
        transcript: &[TranscriptMessage],
    ) -> Result<Uuid, AppError> {
        if transcript.is_empty() {
            self.complete(
                assessment_id,
                AssessmentUpdate {
                    transcript: Some(vec![]),
                    feedback: Some(VoiceFeedback::empty(EMPTY_TRANSCRIPT_MESSAGE)),
                    quiz_score: Some(0.0),
                    improvement_tip: Some(EMPTY_TRANSCRIPT_MESSAGE.to_string()),
                    mark_completed: true,
                },
            )
            .await?;
            warn!("Assessment {assessment_id}: saved empty transcript");
            self.invalidate(subject).await?;
            return Ok(assessment_id);
        }

        let feedback = generate_feedback(self.llm.as_ref(), transcript).await;

        let updated = self
            .complete(
                assessment_id,
                AssessmentUpdate {
                    transcript: Some(transcript.to_vec()),
                    feedback: Some(feedback.clone()),
                    quiz_score: Some(feedback.total_score),
                    improvement_tip: Some(feedback.final_assessment.clone()),
                    mark_completed: true,
                },
            )
            .await?;

        if let Some(address) = user.notification_address() {
            let email =
                voice_feedback_email(address, &feedback, updated.id, &self.settings.app_url);
            self.notifier
                .send(&email)
                .await
                .map_err(|e| AppError::Notification(e.to_string()))?;
        }

        self.invalidate(subject).await?;

        info!(
            "Saved feedback for assessment {} (score {})",
            updated.id, feedback.total_score
        );
        Ok(updated.id)
    }

    /// Writes `update` only if the assessment is still open.
    async fn complete(
        &self,
        assessment_id: Uuid,
        update: AssessmentUpdate,
    ) -> Result<Assessment, AppError> {
        self.store
            .complete_assessment(assessment_id, update)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Assessment {assessment_id} already has feedback"))
            })
    }

    /// Best-effort: a failure here is logged and swallowed. Unconditional, so
    /// it also overwrites a completion this call wrote before failing.
    async fn record_feedback_failure(
        &self,
        subject: &str,
        assessment_id: Uuid,
        transcript: Vec<TranscriptMessage>,
        reason: &str,
    ) {
        let update = AssessmentUpdate {
            transcript: Some(transcript),
            feedback: Some(VoiceFeedback::empty(format!(
                "Failed to generate feedback: {reason}"
            ))),
            quiz_score: None,
            improvement_tip: Some(format!("Failed to process feedback: {reason}")),
            mark_completed: true,
        };
        match self.store.update_assessment(assessment_id, update).await {
            Ok(_) => {
                if let Err(e) = self.invalidate(subject).await {
                    warn!("Failed to invalidate cache after recording failure: {e}");
                }
            }
            Err(e) => {
                error!("Failed to update assessment {assessment_id} with error status: {e}");
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Quizzes
    // ────────────────────────────────────────────────────────────────────────

    /// Generates multiple-choice questions for the caller's profile. Persists nothing.
    pub async fn generate_quiz(&self, subject: &str) -> Result<Vec<QuizQuestion>, AppError> {
        let user = self.resolve_user(subject).await?;
        let industry = user.industry.as_deref().unwrap_or(DEFAULT_TOPIC);

        let questions = generate_quiz_questions(self.llm.as_ref(), industry, &user.skills).await;
        if questions.is_empty() {
            return Err(AppError::ActionFailed(
                "Failed to generate quiz questions".to_string(),
            ));
        }
        Ok(questions)
    }

    /// Grades and stores a quiz attempt, then notifies the user.
    pub async fn save_quiz_result(
        &self,
        subject: &str,
        questions: Vec<QuizQuestion>,
        answers: Vec<Option<String>>,
        score: f64,
    ) -> Result<Assessment, AppError> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(AppError::Validation(
                "score must be a percentage between 0 and 100".to_string(),
            ));
        }

        let user = self.resolve_user(subject).await?;
        let results = grade_quiz(&questions, &answers);

        let wrong: Vec<&QuestionResult> = results.iter().filter(|r| !r.is_correct).collect();
        let improvement_tip = if wrong.is_empty() {
            None
        } else {
            let industry = user.industry.as_deref().unwrap_or(DEFAULT_TOPIC);
            generate_improvement_tip(self.llm.as_ref(), industry, &wrong).await
        };

        match self
            .persist_quiz_result(subject, &user, results, score, improvement_tip)
            .await
        {
            Ok(assessment) => Ok(assessment),
            Err(e) => {
                error!("Error saving quiz result for {subject}: {e}");
                Err(AppError::ActionFailed(
                    "Failed to save quiz result".to_string(),
                ))
            }
        }
    }

    async fn persist_quiz_result(
        &self,
        subject: &str,
        user: &User,
        results: Vec<QuestionResult>,
        score: f64,
        improvement_tip: Option<String>,
    ) -> Result<Assessment, AppError> {
        let assessment = self
            .store
            .create_assessment(NewAssessment {
                user_id: user.id,
                assessment_type: AssessmentType::Quiz,
                category: QUIZ_CATEGORY.to_string(),
                questions: results.into_iter().map(AssessmentQuestion::Quiz).collect(),
                quiz_score: score,
                improvement_tip,
                completed: true,
            })
            .await?;

        if let Some(address) = user.notification_address() {
            let email = quiz_result_email(
                address,
                score,
                assessment.improvement_tip.as_deref(),
                &self.settings.app_url,
            );
            self.notifier
                .send(&email)
                .await
                .map_err(|e| AppError::Notification(e.to_string()))?;
        }

        self.invalidate(subject).await?;

        info!("Saved quiz result {} ({score:.1}%)", assessment.id);
        Ok(assessment)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Reads
    // ────────────────────────────────────────────────────────────────────────

    /// Read-through cached list of the caller's assessments, oldest first.
    pub async fn get_assessments(&self, subject: &str) -> Result<Vec<Assessment>, AppError> {
        let user = self.resolve_user(subject).await?;
        self.load_assessments(subject, &user).await.map_err(|e| {
            error!("Error fetching assessments for {subject}: {e}");
            AppError::ActionFailed("Failed to fetch assessments".to_string())
        })
    }

    async fn load_assessments(&self, subject: &str, user: &User) -> Result<Vec<Assessment>, AppError> {
        let key = assessments_key(subject);

        if let Some(cached) = self.cache.get(&key).await? {
            match serde_json::from_str::<Vec<Assessment>>(&cached) {
                Ok(assessments) => {
                    info!("CACHE HIT: assessments for {subject}");
                    return Ok(assessments);
                }
                Err(e) => warn!("Discarding undecodable cache entry {key}: {e}"),
            }
        }

        info!("CACHE MISS: assessments for {subject}");
        let assessments = self.store.list_assessments(user.id).await?;
        let serialized = serde_json::to_string(&assessments)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize assessments: {e}")))?;
        self.cache
            .set(&key, &serialized, self.settings.cache_ttl_secs)
            .await?;

        Ok(assessments)
    }

    /// One assessment, visible only to its owner.
    pub async fn get_assessment(
        &self,
        subject: &str,
        assessment_id: Uuid,
    ) -> Result<Assessment, AppError> {
        let user = self.resolve_user(subject).await?;
        self.store
            .find_assessment(assessment_id, user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assessment {assessment_id} not found")))
    }

    pub async fn assessment_stats(&self, subject: &str) -> Result<AssessmentStats, AppError> {
        let assessments = self.get_assessments(subject).await?;
        Ok(AssessmentStats::from_assessments(&assessments))
    }
}
