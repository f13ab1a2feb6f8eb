use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Notification error: {0}")]
    Notification(String),

    /// An orchestration action failed part-way; the message is caller-facing.
    #[error("{0}")]
    ActionFailed(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Text safe to show a caller. Infrastructure variants hide their details.
    pub fn client_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Forbidden(msg)
            | AppError::ActionFailed(msg) => msg.clone(),
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Cache(_) => "A cache error occurred".to_string(),
            AppError::Notification(_) => "Failed to send notification".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            AppError::Cache(e) => {
                tracing::error!("Cache error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR")
            }
            AppError::Notification(msg) => {
                tracing::error!("Notification error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "NOTIFICATION_ERROR")
            }
            AppError::ActionFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ACTION_FAILED"),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.client_message()
            }
        }));

        (status, body).into_response()
    }
}
