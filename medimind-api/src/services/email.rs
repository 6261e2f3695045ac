//! Email delivery over the Resend HTTP API

use async_trait::async_trait;
use medimind_common::config::EmailConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const EMAIL_TIMEOUT_SECS: u64 = 10;
const SHARED_TEST_SENDER: &str = "onboarding@resend.dev";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email disabled")]
    Disabled,

    #[error("RESEND_API_KEY not configured")]
    MissingApiKey,

    #[error("403 Forbidden (sender domain not verified?): {0}")]
    Forbidden(String),

    #[error("422 Validation error: {0}")]
    Validation(String),

    #[error("Resend API error {0}: {1}")]
    Api(u16, String),

    #[error("Timeout sending email")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request error: {0}")]
    Request(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Outbound email transport
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message; returns the provider's message id
    async fn send(&self, message: &EmailMessage) -> Result<String, EmailError>;
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    headers: HashMap<&'static str, String>,
}

#[derive(Deserialize)]
struct ResendResponse {
    #[serde(default)]
    id: Option<String>,
}

pub struct ResendClient {
    http_client: reqwest::Client,
    config: EmailConfig,
}

impl ResendClient {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EMAIL_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmailError::Request(e.to_string()))?;

        if config.enabled && config.from.contains(SHARED_TEST_SENDER) {
            warn!(
                "Using shared '{}' sender: emails will only reach the Resend account owner. \
                 Verify a custom domain at https://resend.com/domains to send to all users.",
                SHARED_TEST_SENDER
            );
        }

        Ok(Self {
            http_client,
            config,
        })
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, message: &EmailMessage) -> Result<String, EmailError> {
        if !self.config.enabled {
            info!("Email disabled. Would send to {}: {}", message.to, message.subject);
            return Err(EmailError::Disabled);
        }

        let api_key = self
            .config
            .resend_api_key
            .as_deref()
            .ok_or(EmailError::MissingApiKey)?;

        let mut headers = HashMap::new();
        headers.insert(
            "X-Entity-Ref-ID",
            format!("medimind-{}-{}", message.to, message.subject),
        );

        let payload = ResendPayload {
            from: &self.config.from,
            to: [&message.to],
            subject: &message.subject,
            text: &message.text,
            html: message.html.as_deref(),
            reply_to: self.config.reply_to.as_deref().filter(|r| !r.is_empty()),
            headers,
        };

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmailError::Timeout
                } else if e.is_connect() {
                    EmailError::Connection(e.to_string())
                } else {
                    EmailError::Request(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        match status {
            200 | 201 => {
                let id = response
                    .json::<ResendResponse>()
                    .await
                    .ok()
                    .and_then(|r| r.id)
                    .unwrap_or_else(|| "N/A".to_string());
                info!("Email sent to {}: {} (id={})", message.to, message.subject, id);
                Ok(id)
            }
            403 => Err(EmailError::Forbidden(response.text().await.unwrap_or_default())),
            422 => Err(EmailError::Validation(response.text().await.unwrap_or_default())),
            _ => Err(EmailError::Api(status, response.text().await.unwrap_or_default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, key: Option<&str>) -> EmailConfig {
        EmailConfig {
            enabled,
            resend_api_key: key.map(str::to_string),
            from: "MediMind <reminders@medimind.in>".to_string(),
            reply_to: None,
            test_recipient: None,
            // Never reached by these tests
            endpoint: "http://127.0.0.1:9/emails".to_string(),
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "a@b.co".into(),
            subject: "Hi".into(),
            text: "Body".into(),
            html: None,
        }
    }

    #[tokio::test]
    async fn test_disabled_is_not_sent() {
        let client = ResendClient::new(config(false, Some("re_key"))).unwrap();
        assert!(matches!(client.send(&message()).await, Err(EmailError::Disabled)));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_sent() {
        let client = ResendClient::new(config(true, None)).unwrap();
        assert!(matches!(client.send(&message()).await, Err(EmailError::MissingApiKey)));
    }

    #[test]
    fn test_payload_shape() {
        let mut headers = HashMap::new();
        headers.insert("X-Entity-Ref-ID", "medimind-a@b.co-Hi".to_string());
        let payload = ResendPayload {
            from: "MediMind <r@m.in>",
            to: ["a@b.co"],
            subject: "Hi",
            text: "Body",
            html: None,
            reply_to: Some("help@m.in"),
            headers,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["to"], serde_json::json!(["a@b.co"]));
        assert_eq!(json["reply_to"], "help@m.in");
        assert!(json.get("html").is_none());
        assert_eq!(json["headers"]["X-Entity-Ref-ID"], "medimind-a@b.co-Hi");
    }
}
