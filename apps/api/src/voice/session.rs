//! Call-state machine for one voice interview.
//!
//! ```text
//! idle|finished --begin--> starting --call-start--> active --call-end--> finished
//!        ^                    |                        |
//!        +----start failed----+                        |
//!        +-----------------error (any state)-----------+
//! ```
//!
//! Handlers never panic: an event that does not apply to the current state
//! returns `TransitionError` and leaves the session untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::assessment::TranscriptMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Idle,
    Starting,
    Active,
    Finished,
}

impl CallStatus {
    /// Whether the call is live enough to accept mute and stop commands.
    pub fn is_live(self) -> bool {
        matches!(self, CallStatus::Starting | CallStatus::Active)
    }
}

/// A `message` payload as emitted by the voice SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    /// `partial` or `final`. Absent means final.
    #[serde(default)]
    pub transcript_type: Option<String>,
}

impl SdkMessage {
    /// The transcript line carried by this message, if it is a final transcript.
    pub fn final_transcript(&self) -> Option<TranscriptMessage> {
        if self.kind != "transcript" {
            return None;
        }
        if self.transcript_type.as_deref().is_some_and(|t| t != "final") {
            return None;
        }
        Some(TranscriptMessage {
            role: self.role.clone()?,
            message: self.transcript.clone()?,
        })
    }
}

/// Events delivered by the voice SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum VoiceEvent {
    CallStart,
    CallEnd,
    Message { message: SdkMessage },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl VoiceEvent {
    fn name(&self) -> &'static str {
        match self {
            VoiceEvent::CallStart => "call-start",
            VoiceEvent::CallEnd => "call-end",
            VoiceEvent::Message { .. } => "message",
            VoiceEvent::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot handle {action} while {from:?}")]
pub struct TransitionError {
    pub from: CallStatus,
    pub action: &'static str,
}

/// What the caller must do after an event was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    None,
    /// A transcript line was appended.
    Recorded(TranscriptMessage),
    /// The call ended; the buffered transcript is handed over.
    Ended(Vec<TranscriptMessage>),
    /// The call failed; the session is back to idle.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct VoiceSession {
    status: CallStatus,
    muted: bool,
    transcript: Vec<TranscriptMessage>,
}

impl Default for VoiceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceSession {
    pub fn new() -> Self {
        Self {
            status: CallStatus::Idle,
            muted: false,
            transcript: Vec::new(),
        }
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn transcript(&self) -> &[TranscriptMessage] {
        &self.transcript
    }

    /// Latest transcript line, shown while the call runs.
    pub fn current_message(&self) -> Option<&TranscriptMessage> {
        self.transcript.last()
    }

    fn invalid(&self, action: &'static str) -> TransitionError {
        TransitionError {
            from: self.status,
            action,
        }
    }

    /// User asked to start a call.
    pub fn begin(&mut self) -> Result<(), TransitionError> {
        match self.status {
            CallStatus::Idle | CallStatus::Finished => {
                self.status = CallStatus::Starting;
                self.muted = false;
                Ok(())
            }
            _ => Err(self.invalid("begin")),
        }
    }

    /// The start orchestration call failed before the SDK connected.
    pub fn start_failed(&mut self) -> Result<(), TransitionError> {
        match self.status {
            CallStatus::Starting => {
                self.status = CallStatus::Idle;
                Ok(())
            }
            _ => Err(self.invalid("start failure")),
        }
    }

    pub fn on_event(&mut self, event: &VoiceEvent) -> Result<SessionOutput, TransitionError> {
        match (self.status, event) {
            (_, VoiceEvent::Error { message }) => {
                self.status = CallStatus::Idle;
                Ok(SessionOutput::Failed(message.clone()))
            }
            (CallStatus::Starting, VoiceEvent::CallStart) => {
                self.status = CallStatus::Active;
                self.transcript.clear();
                Ok(SessionOutput::None)
            }
            (CallStatus::Active, VoiceEvent::Message { message }) => {
                Ok(match message.final_transcript() {
                    Some(line) => {
                        self.transcript.push(line.clone());
                        SessionOutput::Recorded(line)
                    }
                    None => SessionOutput::None,
                })
            }
            (CallStatus::Active, VoiceEvent::CallEnd) => {
                self.status = CallStatus::Finished;
                Ok(SessionOutput::Ended(std::mem::take(&mut self.transcript)))
            }
            _ => Err(self.invalid(event.name())),
        }
    }

    /// Flips mute and returns the new state.
    pub fn toggle_mute(&mut self) -> Result<bool, TransitionError> {
        if !self.status.is_live() {
            return Err(self.invalid("mute"));
        }
        self.muted = !self.muted;
        Ok(self.muted)
    }
}
