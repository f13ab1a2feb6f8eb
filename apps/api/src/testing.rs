//! In-memory fakes of the gateway traits, for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::{ErrorKind, RedisError};
use sqlx::types::Json;
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::interview::service::{InterviewService, ServiceSettings};
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::assessment::{Assessment, AssessmentUpdate, NewAssessment};
use crate::models::user::User;
use crate::notify::{Email, Notifier, NotifyError};
use crate::store::AssessmentStore;

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

/// Replays queued responses in order. An empty queue answers `EmptyContent`.
/// Yields once before answering, so concurrent callers interleave here.
#[derive(Default)]
pub struct FakeGenerator {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, err: LlmError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        tokio::task::yield_now().await;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreInner {
    users: Vec<User>,
    assessments: Vec<Assessment>,
    list_calls: usize,
    updates: Vec<(Uuid, AssessmentUpdate)>,
    fail_creates: bool,
    /// Number of upcoming update calls that fail.
    failing_updates: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

fn injected(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected {what} failure"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, external_id: &str, email: Option<&str>, industry: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            email: email.map(str::to_string),
            industry: industry.map(str::to_string),
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().users.push(user.clone());
        user
    }

    pub fn assessment(&self, id: Uuid) -> Option<Assessment> {
        let inner = self.inner.lock().unwrap();
        inner.assessments.iter().find(|a| a.id == id).cloned()
    }

    pub fn assessment_count(&self) -> usize {
        self.inner.lock().unwrap().assessments.len()
    }

    pub fn list_calls(&self) -> usize {
        self.inner.lock().unwrap().list_calls
    }

    pub fn update_calls(&self) -> usize {
        self.inner.lock().unwrap().updates.len()
    }

    pub fn fail_creates(&self) {
        self.inner.lock().unwrap().fail_creates = true;
    }

    pub fn fail_next_updates(&self, count: usize) {
        self.inner.lock().unwrap().failing_updates = count;
    }

    /// Shared by both update paths. `only_open` skips completed rows the way
    /// `completed_at IS NULL` does in SQL.
    fn apply_update(
        &self,
        id: Uuid,
        update: AssessmentUpdate,
        only_open: bool,
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.updates.push((id, update.clone()));
        if inner.failing_updates > 0 {
            inner.failing_updates -= 1;
            return Err(injected("update"));
        }
        let Some(assessment) = inner
            .assessments
            .iter_mut()
            .find(|a| a.id == id && !(only_open && a.completed_at.is_some()))
        else {
            return Ok(None);
        };
        if let Some(transcript) = update.transcript {
            assessment.transcript = Json(transcript);
        }
        if let Some(feedback) = update.feedback {
            assessment.feedback = Some(Json(feedback));
        }
        if let Some(score) = update.quiz_score {
            assessment.quiz_score = score;
        }
        if let Some(tip) = update.improvement_tip {
            assessment.improvement_tip = Some(tip);
        }
        if update.mark_completed {
            assessment.completed_at = Some(Utc::now());
        }
        Ok(Some(assessment.clone()))
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn find_user(&self, external_id: &str) -> Result<Option<User>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn create_assessment(&self, new: NewAssessment) -> Result<Assessment, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_creates {
            return Err(injected("create"));
        }
        // Strictly increasing timestamps keep ordering deterministic.
        let created_at = Utc::now() + Duration::milliseconds(inner.assessments.len() as i64);
        let assessment = Assessment {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            assessment_type: new.assessment_type,
            category: new.category,
            questions: Json(new.questions),
            quiz_score: new.quiz_score,
            improvement_tip: new.improvement_tip,
            transcript: Json(vec![]),
            feedback: None,
            created_at,
            completed_at: new.completed.then_some(created_at),
        };
        inner.assessments.push(assessment.clone());
        Ok(assessment)
    }

    async fn update_assessment(
        &self,
        id: Uuid,
        update: AssessmentUpdate,
    ) -> Result<Assessment, sqlx::Error> {
        self.apply_update(id, update, false)?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn complete_assessment(
        &self,
        id: Uuid,
        update: AssessmentUpdate,
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let update = AssessmentUpdate {
            mark_completed: true,
            ..update
        };
        self.apply_update(id, update, true)
    }

    async fn find_assessment(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Assessment>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .assessments
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn list_assessments(&self, user_id: Uuid) -> Result<Vec<Assessment>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_calls += 1;
        let mut list: Vec<Assessment> = inner
            .assessments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| a.created_at);
        Ok(list)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cache
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, (String, u64)>,
    deleted: Vec<String>,
    fail_all: bool,
}

#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<CacheInner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &str) -> Option<(String, u64)> {
        self.inner.lock().unwrap().entries.get(key).cloned()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn fail_all(&self) {
        self.inner.lock().unwrap().fail_all = true;
    }

    fn check(&self) -> Result<(), RedisError> {
        if self.inner.lock().unwrap().fail_all {
            return Err(RedisError::from((ErrorKind::IoError, "injected cache failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        self.check()?;
        Ok(self.entry(key).map(|(value, _)| value))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), RedisError> {
        self.check()?;
        self.inner
            .lock()
            .unwrap()
            .entries
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), RedisError> {
        self.check()?;
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(key);
        inner.deleted.push(key.to_string());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Notifier
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Email>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_all(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Api {
                status: 500,
                message: "injected notify failure".into(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wiring
// ────────────────────────────────────────────────────────────────────────────

pub const TEST_TTL_SECS: u64 = 3600;
pub const TEST_APP_URL: &str = "https://mirror.test";

/// A service wired to fresh fakes, with handles kept for assertions.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub llm: Arc<FakeGenerator>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: Arc<InterviewService>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let llm = Arc::new(FakeGenerator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = Arc::new(InterviewService::new(
            store.clone(),
            cache.clone(),
            llm.clone(),
            notifier.clone(),
            ServiceSettings {
                app_url: TEST_APP_URL.to_string(),
                cache_ttl_secs: TEST_TTL_SECS,
            },
        ));
        Self {
            store,
            cache,
            llm,
            notifier,
            service,
        }
    }
}
