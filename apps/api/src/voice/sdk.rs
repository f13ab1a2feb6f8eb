//! Outbound boundary to the voice-call SDK.
//!
//! The browser owns the real SDK instance. Server-side sessions drive a
//! `CommandQueue`, whose recorded commands are handed back to the client to
//! execute in order.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::assessment::InterviewQuestion;

pub const INLINE_PROVIDER: &str = "google";
pub const INLINE_MODEL: &str = "gemini-1.5-flash";

/// Persona for the voice interviewer when no pre-registered assistant is configured.
pub const INTERVIEWER_SYSTEM_PROMPT: &str = r#"You are an expert technical interviewer named 'Alex'. Your goal is to conduct a professional and helpful mock interview.
The user's interview topic and a list of questions are provided in the 'variables'.
1. Start by introducing yourself ("Hi, I'm Alex") and stating the interview topic.
2. Ask the questions from the 'questions' variable one by one. Each item has a "question" and a "followUp".
3. After the user answers a question, DO NOT give feedback.
4. Simply acknowledge their answer ("Got it, thank you.", "Okay, thanks for sharing.") and then ask the corresponding 'followUp' question.
5. After they answer the follow-up, acknowledge it and move to the next main question.
6. Be friendly, professional, and conversational.
7. After you have asked ALL questions, say "That's all the questions I have. Thank you for your time. Your feedback report will be generated now. Have a great day!" and then end the call."#;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Failed to encode session variables: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Variables exposed to the voice agent during the call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVariables {
    pub assessment_id: Uuid,
    /// JSON-encoded question list.
    pub questions: String,
}

impl SessionVariables {
    pub fn new(assessment_id: Uuid, questions: &[InterviewQuestion]) -> Result<Self, SdkError> {
        Ok(Self {
            assessment_id,
            questions: serde_json::to_string(questions)?,
        })
    }
}

/// How the SDK is told which agent to run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum SessionConfig {
    #[serde(rename_all = "camelCase")]
    InlineModel {
        provider: String,
        model: String,
        system_prompt: String,
        voice: String,
        variables: SessionVariables,
    },
    #[serde(rename_all = "camelCase")]
    Assistant {
        assistant_id: String,
        variables: SessionVariables,
    },
}

#[cfg(test)]
impl SessionConfig {
    pub fn variables(&self) -> &SessionVariables {
        match self {
            SessionConfig::InlineModel { variables, .. } => variables,
            SessionConfig::Assistant { variables, .. } => variables,
        }
    }
}

/// Deployment choice between an inline model and a pre-registered assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub assistant_id: Option<String>,
    pub voice: String,
}

impl VoiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            assistant_id: config.vapi_assistant_id.clone(),
            voice: config.vapi_voice.clone(),
        }
    }

    pub fn session_config(&self, variables: SessionVariables) -> SessionConfig {
        match &self.assistant_id {
            Some(assistant_id) => SessionConfig::Assistant {
                assistant_id: assistant_id.clone(),
                variables,
            },
            None => SessionConfig::InlineModel {
                provider: INLINE_PROVIDER.to_string(),
                model: INLINE_MODEL.to_string(),
                system_prompt: INTERVIEWER_SYSTEM_PROMPT.to_string(),
                voice: self.voice.clone(),
                variables,
            },
        }
    }
}

pub trait VoiceSdk: Send {
    fn start(&mut self, config: SessionConfig) -> Result<(), SdkError>;
    fn stop(&mut self) -> Result<(), SdkError>;
    fn set_muted(&mut self, muted: bool) -> Result<(), SdkError>;
}

/// A command the client-side SDK must execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum VoiceCommand {
    Start { config: SessionConfig },
    Stop,
    SetMuted { muted: bool },
}

/// Records SDK commands for relay to the client.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<VoiceCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every command recorded since the last drain.
    pub fn drain(&mut self) -> Vec<VoiceCommand> {
        std::mem::take(&mut self.pending)
    }
}

impl VoiceSdk for CommandQueue {
    fn start(&mut self, config: SessionConfig) -> Result<(), SdkError> {
        self.pending.push(VoiceCommand::Start { config });
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SdkError> {
        self.pending.push(VoiceCommand::Stop);
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<(), SdkError> {
        self.pending.push(VoiceCommand::SetMuted { muted });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> SessionVariables {
        SessionVariables::new(
            Uuid::nil(),
            &[InterviewQuestion {
                question: "Q".into(),
                follow_up: "F".into(),
            }],
        )
        .unwrap()
    }

    #[test]
    fn test_variables_carry_json_encoded_questions() {
        let vars = variables();
        assert_eq!(vars.questions, r#"[{"question":"Q","followUp":"F"}]"#);
        let json = serde_json::to_value(&vars).unwrap();
        assert!(json.get("assessmentId").is_some());
    }

    #[test]
    fn test_inline_model_without_assistant_id() {
        let settings = VoiceSettings {
            assistant_id: None,
            voice: "jennifer-playht".into(),
        };
        let config = settings.session_config(variables());
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["mode"], "inlineModel");
        assert_eq!(json["provider"], "google");
        assert_eq!(json["model"], "gemini-1.5-flash");
        assert_eq!(json["voice"], "jennifer-playht");
        assert!(json["systemPrompt"].as_str().unwrap().contains("'Alex'"));
        assert_eq!(json["variables"]["assessmentId"], Uuid::nil().to_string());
    }

    #[test]
    fn test_assistant_mode_when_configured() {
        let settings = VoiceSettings {
            assistant_id: Some("asst_123".into()),
            voice: "ignored".into(),
        };
        let config = settings.session_config(variables());
        assert!(matches!(config, SessionConfig::Assistant { ref assistant_id, .. } if assistant_id == "asst_123"));
        assert_eq!(config.variables().assessment_id, Uuid::nil());
    }

    #[test]
    fn test_command_queue_drains_in_order() {
        let mut queue = CommandQueue::new();
        queue.set_muted(true).unwrap();
        queue.stop().unwrap();
        assert_eq!(
            queue.drain(),
            vec![VoiceCommand::SetMuted { muted: true }, VoiceCommand::Stop]
        );
        assert!(queue.drain().is_empty());
    }
}
