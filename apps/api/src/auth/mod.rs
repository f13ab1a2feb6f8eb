//! Caller identity.
//!
//! Session validation happens upstream at the identity provider's edge; by the
//! time a request reaches this API the authenticated subject id is carried in
//! the `x-auth-subject` header. A missing or blank header means "no session".

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;

pub const SUBJECT_HEADER: &str = "x-auth-subject";

/// The authenticated identity-provider subject id of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

impl Caller {
    pub fn subject(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SUBJECT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Caller(s.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}
