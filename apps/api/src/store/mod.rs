//! Persistence gateway for users and assessments.
//!
//! `AppState` carries an `Arc<dyn AssessmentStore>`; production uses `PgStore`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::assessment::{Assessment, AssessmentUpdate, NewAssessment};
use crate::models::user::User;

pub mod postgres;

pub use postgres::PgStore;

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Looks up the local user for an identity-provider subject id.
    async fn find_user(&self, external_id: &str) -> Result<Option<User>, sqlx::Error>;

    async fn create_assessment(&self, new: NewAssessment) -> Result<Assessment, sqlx::Error>;

    /// Applies a partial update. Fails with `RowNotFound` if the id is unknown.
    async fn update_assessment(
        &self,
        id: Uuid,
        update: AssessmentUpdate,
    ) -> Result<Assessment, sqlx::Error>;

    /// Applies `update` and stamps `completed_at`, only while the assessment is
    /// still open. `None` when the id is unknown or already completed.
    async fn complete_assessment(
        &self,
        id: Uuid,
        update: AssessmentUpdate,
    ) -> Result<Option<Assessment>, sqlx::Error>;

    /// Fetches one assessment only if it belongs to `user_id`.
    async fn find_assessment(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Assessment>, sqlx::Error>;

    /// All assessments of a user, oldest first.
    async fn list_assessments(&self, user_id: Uuid) -> Result<Vec<Assessment>, sqlx::Error>;
}
