use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A local user record. Created by the identity provider sync, never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Identity-provider subject id.
    pub external_id: String,
    pub email: Option<String>,
    pub industry: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Email address to notify, if one is on file and non-blank.
    pub fn notification_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}
