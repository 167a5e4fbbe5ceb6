//! Transactional email delivery through the Resend HTTP API.
//!
//! One attempt per call: no retry, no queue. A failure is handed straight
//! back so the surrounding create/update can abort.

use std::time::Duration;

use async_trait::async_trait;
use db::models::ValidationError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

const RESEND_API_URL: &str = "https://api.resend.com";
pub const DEFAULT_FROM: &str = "onboarding@resend.dev";
pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("email delivery is not configured")]
    NotConfigured,
    /// The provider answered with a recognised error body.
    #[error("{0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("{}", UNKNOWN_ERROR)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingEmail {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.to.trim().is_empty() {
            return Err(ValidationError::new("to is required"));
        }
        if self.subject.trim().is_empty() {
            return Err(ValidationError::new("subject is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub success: bool,
    pub message_id: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Used when no API key is configured. Every send fails.
#[derive(Debug, Default, Clone)]
pub struct DisabledSender;

#[async_trait]
impl EmailSender for DisabledSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, DeliveryError> {
        warn!(to = %email.to, "Email send requested but delivery is not configured");
        Err(DeliveryError::NotConfigured)
    }
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendSuccess {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResendClient {
    http: Client,
    api_key: SecretString,
    from: String,
    base_url: String,
}

impl ResendClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(api_key: SecretString, from: Option<String>) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("followup-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            from: from.unwrap_or_else(|| DEFAULT_FROM.to_string()),
            base_url: RESEND_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, DeliveryError> {
        let request = ResendRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html_body,
        };

        let res = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if status.is_success() {
            let parsed: ResendSuccess =
                serde_json::from_str(&body).map_err(|_| DeliveryError::Unknown)?;
            info!(to = %email.to, message_id = %parsed.id, "Email sent");
            return Ok(DeliveryReceipt {
                success: true,
                message_id: parsed.id,
            });
        }

        let err = parse_error_body(&body);
        warn!(status = status.as_u16(), error = %err, "Email provider rejected send");
        Err(err)
    }
}

/// Recognised `{ "message": .. }` bodies keep their message; anything else
/// collapses to the generic fallback.
fn parse_error_body(body: &str) -> DeliveryError {
    serde_json::from_str::<ResendErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .map_or(DeliveryError::Unknown, DeliveryError::Rejected)
}
