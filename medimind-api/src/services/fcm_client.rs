//! Firebase Cloud Messaging (HTTP v1) client
//!
//! Authenticates as a service account: a signed RS256 assertion is exchanged
//! for an OAuth2 access token, cached until shortly before it expires.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const FCM_TIMEOUT_SECS: u64 = 10;
const TOKEN_LIFETIME_SECS: u64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push not configured: {0}")]
    NotConfigured(String),

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Sender ID mismatch - check Firebase configuration")]
    SenderIdMismatch,

    #[error("OAuth error: {0}")]
    Auth(String),

    #[error("FCM API error {0}: {1}")]
    Api(u16, String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

/// Device push transport
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver a notification; returns the provider's message name
    async fn send(&self, message: &PushMessage) -> Result<String, PushError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct FcmClient {
    http_client: reqwest::Client,
    account: ServiceAccount,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl FcmClient {
    /// Load service-account credentials from a JSON file
    pub fn from_credentials_file(path: &Path) -> Result<Self, PushError> {
        if !path.exists() {
            return Err(PushError::NotConfigured(format!(
                "credentials file not found at {}",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| PushError::NotConfigured(format!("read {}: {}", path.display(), e)))?;
        let account: ServiceAccount = serde_json::from_str(&raw)
            .map_err(|e| PushError::NotConfigured(format!("parse {}: {}", path.display(), e)))?;

        Self::new(account)
    }

    pub fn new(account: ServiceAccount) -> Result<Self, PushError> {
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| PushError::NotConfigured(format!("invalid private key: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FCM_TIMEOUT_SECS))
            .build()
            .map_err(|e| PushError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            account,
            signing_key,
            token: Mutex::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    async fn access_token(&self) -> Result<String, PushError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + Duration::from_secs(TOKEN_REFRESH_MARGIN_SECS) {
                return Ok(token.access_token.clone());
            }
        }

        let token_url = self.account.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URL);
        let iat = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: token_url,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| PushError::Auth(e.to_string()))?;

        let response = self
            .http_client
            .post(token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PushError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PushError::Auth(e.to_string()))?;

        debug!("Obtained FCM access token");
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now()
                + Duration::from_secs(token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS)),
        });

        Ok(access_token)
    }
}

/// FCM v1 request body for one device
pub fn message_body(message: &PushMessage) -> serde_json::Value {
    json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
            "android": {
                "priority": "high",
                "notification": {
                    "icon": "notification_icon",
                    "color": "#667eea",
                    "sound": "default",
                    "channel_id": "medication_reminders",
                },
            },
            "apns": {
                "payload": {
                    "aps": {
                        "sound": "default",
                        "badge": 1,
                    },
                },
            },
        }
    })
}

/// Map an FCM error response to a typed error
pub fn classify_error(status: u16, body: &str) -> PushError {
    let parsed: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let error_codes: Vec<String> = parsed["error"]["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["errorCode"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let lower = body.to_lowercase();

    let has_code = |code: &str| error_codes.iter().any(|c| c == code);

    if has_code("UNREGISTERED")
        || lower.contains("not-registered")
        || lower.contains("invalid-registration")
        || (has_code("INVALID_ARGUMENT") && lower.contains("registration token"))
    {
        PushError::InvalidToken
    } else if has_code("SENDER_ID_MISMATCH") || lower.contains("sender-id-mismatch") {
        PushError::SenderIdMismatch
    } else {
        PushError::Api(status, body.to_string())
    }
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    name: Option<String>,
}

#[async_trait]
impl PushSender for FcmClient {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        if message.token.is_empty() {
            return Err(PushError::InvalidToken);
        }

        let access_token = self.access_token().await?;
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.account.project_id
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&message_body(message))
            .send()
            .await
            .map_err(|e| PushError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        let name = response
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|r| r.name)
            .unwrap_or_default();
        info!("FCM message sent: {}", name);
        Ok(name)
    }
}
