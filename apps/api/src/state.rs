use std::sync::Arc;

use crate::interview::InterviewService;
use crate::voice::VoiceSessions;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Assessment orchestration over the store, cache, generator and notifier.
    pub interviewer: Arc<InterviewService>,
    /// Live voice-call bridges driven through the relay endpoints.
    pub voice: Arc<VoiceSessions>,
}
