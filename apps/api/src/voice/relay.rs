//! HTTP relay for voice sessions.
//!
//! The browser runs the voice SDK and forwards its events here. Each live
//! session is a `VoiceBridge<CommandQueue>`; every response carries the SDK
//! commands the client must execute next.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::models::assessment::{InterviewQuestion, TranscriptMessage};
use crate::state::AppState;
use crate::voice::bridge::{BridgeError, BridgeOutcome, VoiceBridge};
use crate::voice::sdk::{CommandQueue, VoiceCommand, VoiceSettings};
use crate::voice::session::{CallStatus, VoiceEvent};

type SharedBridge = Arc<Mutex<VoiceBridge<CommandQueue>>>;

struct SessionEntry {
    owner: String,
    bridge: SharedBridge,
    touched: Instant,
}

impl SessionEntry {
    fn is_expired(&self, now: Instant, idle_ttl: Duration) -> bool {
        now.duration_since(self.touched) >= idle_ttl
    }
}

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Transition(e) => AppError::Conflict(e.to_string()),
            BridgeError::Action(e) => e,
            BridgeError::Sdk(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Live voice sessions keyed by session id, each tagged with its owner's subject.
/// A session untouched for `idle_ttl` is dropped.
pub struct VoiceSessions {
    settings: VoiceSettings,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl VoiceSessions {
    pub fn new(settings: VoiceSettings, idle_ttl: Duration) -> Self {
        Self {
            settings,
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    async fn insert(&self, id: Uuid, bridge: VoiceBridge<CommandQueue>) {
        let owner = bridge.subject().to_string();
        let mut sessions = self.sessions.lock().await;
        Self::evict(&mut sessions, self.idle_ttl);
        sessions.insert(
            id,
            SessionEntry {
                owner,
                bridge: Arc::new(Mutex::new(bridge)),
                touched: Instant::now(),
            },
        );
    }

    /// Looks up a session owned by `subject` and marks it as touched.
    /// Other callers' sessions are invisible; expired ones are dropped.
    async fn get(&self, id: Uuid, subject: &str) -> Result<SharedBridge, AppError> {
        let not_found = || AppError::NotFound(format!("Voice session {id} not found"));
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        let expired = match sessions.get(&id) {
            Some(entry) if entry.owner == subject => entry.is_expired(now, self.idle_ttl),
            _ => return Err(not_found()),
        };
        if expired {
            sessions.remove(&id);
            info!("Voice session {id} expired");
            return Err(not_found());
        }

        let entry = sessions.get_mut(&id).ok_or_else(not_found)?;
        entry.touched = now;
        Ok(entry.bridge.clone())
    }

    async fn remove(&self, id: Uuid) {
        if self.sessions.lock().await.remove(&id).is_some() {
            info!("Voice session {id} closed");
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drops every session idle for longer than the TTL. Returns how many went.
    pub async fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        Self::evict(&mut sessions, self.idle_ttl)
    }

    fn evict(sessions: &mut HashMap<Uuid, SessionEntry>, idle_ttl: Duration) -> usize {
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let expired = entry.is_expired(now, idle_ttl);
            if expired {
                info!("Voice session {id} expired");
            }
            !expired
        });
        before - sessions.len()
    }

    /// Runs `evict_expired` every `period` for the life of the process.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let sessions = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let evicted = sessions.evict_expired().await;
                if evicted > 0 {
                    debug!("Swept {evicted} idle voice sessions");
                }
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    /// Desired state. Omitted means toggle.
    #[serde(default)]
    pub muted: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub status: CallStatus,
    pub muted: bool,
    pub assessment_id: Option<Uuid>,
    /// Final transcript lines recorded so far.
    pub transcript_lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_message: Option<TranscriptMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<InterviewQuestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BridgeOutcome>,
    pub commands: Vec<VoiceCommand>,
}

impl SessionResponse {
    fn snapshot(session_id: Uuid, bridge: &mut VoiceBridge<CommandQueue>) -> Self {
        Self {
            session_id,
            status: bridge.status(),
            muted: bridge.session().is_muted(),
            assessment_id: bridge.assessment_id(),
            transcript_lines: bridge.session().transcript().len(),
            current_message: bridge.session().current_message().cloned(),
            questions: None,
            outcome: None,
            commands: bridge.sdk_mut().drain(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/voice/sessions
///
/// Opens the assessment and returns the SDK start command.
pub async fn handle_start_session(
    State(state): State<AppState>,
    caller: Caller,
    request: Option<Json<StartSessionRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let topic = request.and_then(|Json(r)| r.topic);
    let mut bridge = VoiceBridge::new(
        caller.subject(),
        state.interviewer.clone(),
        state.voice.settings().clone(),
        CommandQueue::new(),
    );
    let started = bridge.start(topic.as_deref()).await?;

    let session_id = Uuid::new_v4();
    let mut response = SessionResponse::snapshot(session_id, &mut bridge);
    response.questions = Some(started.questions);
    state.voice.insert(session_id, bridge).await;

    info!(
        "Voice session {session_id} opened for assessment {}",
        started.assessment_id
    );
    Ok(Json(response))
}

/// GET /api/v1/voice/sessions/:id
pub async fn handle_session_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let bridge = state.voice.get(session_id, caller.subject()).await?;
    let mut bridge = bridge.lock().await;
    Ok(Json(SessionResponse::snapshot(session_id, &mut bridge)))
}

/// POST /api/v1/voice/sessions/:id/events
///
/// Applies one SDK event. Sessions that finish or fall back to idle are closed.
pub async fn handle_session_event(
    State(state): State<AppState>,
    caller: Caller,
    Path(session_id): Path<Uuid>,
    Json(event): Json<VoiceEvent>,
) -> Result<Json<SessionResponse>, AppError> {
    let bridge = state.voice.get(session_id, caller.subject()).await?;
    let mut bridge = bridge.lock().await;

    let outcome = bridge.handle_event(event).await?;
    let mut response = SessionResponse::snapshot(session_id, &mut bridge);
    response.outcome = Some(outcome);
    drop(bridge);

    if matches!(response.status, CallStatus::Finished | CallStatus::Idle) {
        state.voice.remove(session_id).await;
    }
    Ok(Json(response))
}

/// POST /api/v1/voice/sessions/:id/stop
pub async fn handle_session_stop(
    State(state): State<AppState>,
    caller: Caller,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let bridge = state.voice.get(session_id, caller.subject()).await?;
    let mut bridge = bridge.lock().await;
    bridge.end_call()?;
    Ok(Json(SessionResponse::snapshot(session_id, &mut bridge)))
}

/// POST /api/v1/voice/sessions/:id/mute
pub async fn handle_session_mute(
    State(state): State<AppState>,
    caller: Caller,
    Path(session_id): Path<Uuid>,
    request: Option<Json<MuteRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let desired = request.and_then(|Json(r)| r.muted);
    let bridge = state.voice.get(session_id, caller.subject()).await?;
    let mut bridge = bridge.lock().await;
    if desired != Some(bridge.session().is_muted()) {
        bridge.toggle_mute()?;
    }
    Ok(Json(SessionResponse::snapshot(session_id, &mut bridge)))
}
