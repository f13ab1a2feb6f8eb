//! Notification client: one templated HTML email to one address.
//!
//! Sends are fire-and-forget from the caller's point of view: a failure is
//! returned once and never retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub mod templates;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendError {
    message: String,
}

/// Resend HTTP API client. Constructed once per process.
#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
    from: String,
}

impl ResendClient {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Notifier for ResendClient {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ResendError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendEmailResponse = response.json().await?;
        info!("Email {} sent: {:?}", sent.id, email.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_wraps_recipient_in_list() {
        let body = SendEmailRequest {
            from: "Mirror <a@b.dev>",
            to: ["user@example.com"],
            subject: "Hi",
            html: "<p>x</p>",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"], serde_json::json!(["user@example.com"]));
        assert_eq!(json["from"], "Mirror <a@b.dev>");
    }
}
