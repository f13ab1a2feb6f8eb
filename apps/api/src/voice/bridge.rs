//! Drives one voice interview: orchestration calls on one side, SDK commands on the other.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::service::VoiceInterviewStarted;
use crate::interview::InterviewService;
use crate::models::assessment::TranscriptMessage;
use crate::voice::sdk::{SdkError, SessionVariables, VoiceSdk, VoiceSettings};
use crate::voice::session::{
    CallStatus, SessionOutput, TransitionError, VoiceEvent, VoiceSession,
};

/// Where the client goes when a call cannot be saved.
pub const INTERVIEW_LIST_PATH: &str = "/interview";

pub fn feedback_path(assessment_id: Uuid) -> String {
    format!("/interview/feedback/{assessment_id}")
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Action(#[from] AppError),

    #[error(transparent)]
    Sdk(#[from] SdkError),
}

/// Result of applying one SDK event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BridgeOutcome {
    Continue,
    Recorded { line: TranscriptMessage },
    /// The call ended and the client should navigate to `path`.
    Redirect {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The SDK reported an error; the session is idle again.
    Failed { message: String },
}

pub struct VoiceBridge<S: VoiceSdk> {
    subject: String,
    interviewer: Arc<InterviewService>,
    settings: VoiceSettings,
    sdk: S,
    session: VoiceSession,
    assessment_id: Option<Uuid>,
}

impl<S: VoiceSdk> VoiceBridge<S> {
    pub fn new(
        subject: impl Into<String>,
        interviewer: Arc<InterviewService>,
        settings: VoiceSettings,
        sdk: S,
    ) -> Self {
        Self {
            subject: subject.into(),
            interviewer,
            settings,
            sdk,
            session: VoiceSession::new(),
            assessment_id: None,
        }
    }

    pub fn status(&self) -> CallStatus {
        self.session.status()
    }

    pub fn session(&self) -> &VoiceSession {
        &self.session
    }

    pub fn assessment_id(&self) -> Option<Uuid> {
        self.assessment_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sdk_mut(&mut self) -> &mut S {
        &mut self.sdk
    }

    /// Opens the assessment and starts the SDK call. Any failure returns the session to idle.
    pub async fn start(&mut self, topic: Option<&str>) -> Result<VoiceInterviewStarted, BridgeError> {
        self.session.begin()?;

        match self.open_call(topic).await {
            Ok(started) => Ok(started),
            Err(e) => {
                warn!("Failed to start voice interview for {}: {e}", self.subject);
                self.session.start_failed()?;
                Err(e)
            }
        }
    }

    async fn open_call(&mut self, topic: Option<&str>) -> Result<VoiceInterviewStarted, BridgeError> {
        let started = self
            .interviewer
            .start_voice_interview(&self.subject, topic)
            .await?;
        self.assessment_id = Some(started.assessment_id);

        let variables = SessionVariables::new(started.assessment_id, &started.questions)?;
        self.sdk.start(self.settings.session_config(variables))?;
        Ok(started)
    }

    pub async fn handle_event(&mut self, event: VoiceEvent) -> Result<BridgeOutcome, BridgeError> {
        let outcome = match self.session.on_event(&event)? {
            SessionOutput::None => BridgeOutcome::Continue,
            SessionOutput::Recorded(line) => BridgeOutcome::Recorded { line },
            SessionOutput::Failed(message) => {
                warn!("Voice call error for {}: {message}", self.subject);
                BridgeOutcome::Failed { message }
            }
            SessionOutput::Ended(transcript) => self.save_feedback(transcript).await,
        };
        Ok(outcome)
    }

    async fn save_feedback(&mut self, transcript: Vec<TranscriptMessage>) -> BridgeOutcome {
        let Some(assessment_id) = self.assessment_id else {
            return BridgeOutcome::Redirect {
                path: INTERVIEW_LIST_PATH.to_string(),
                error: Some("No interview in progress".to_string()),
            };
        };

        info!(
            "Call ended for assessment {assessment_id} with {} transcript lines",
            transcript.len()
        );

        match self
            .interviewer
            .save_voice_interview_feedback(&self.subject, assessment_id, transcript)
            .await
        {
            Ok(id) => BridgeOutcome::Redirect {
                path: feedback_path(id),
                error: None,
            },
            Err(e) => {
                warn!("Failed to save feedback for {assessment_id}: {e}");
                BridgeOutcome::Redirect {
                    path: INTERVIEW_LIST_PATH.to_string(),
                    error: Some(e.client_message()),
                }
            }
        }
    }

    /// Asks the SDK to hang up. The resulting `call-end` event completes the session.
    pub fn end_call(&mut self) -> Result<(), BridgeError> {
        if !self.session.status().is_live() {
            return Err(TransitionError {
                from: self.session.status(),
                action: "stop",
            }
            .into());
        }
        self.sdk.stop()?;
        Ok(())
    }

    /// Returns the new mute state.
    pub fn toggle_mute(&mut self) -> Result<bool, BridgeError> {
        let muted = self.session.toggle_mute()?;
        self.sdk.set_muted(muted)?;
        Ok(muted)
    }
}
