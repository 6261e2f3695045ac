//! OpenAI-compatible chat completion client (Groq)
//!
//! One round-trip per call. Callers supply both prompts and get back the
//! raw assistant content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty completion")]
    Empty,
}

/// One chat completion request
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Chat model returning a JSON object as text
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete_json(&self, request: ChatRequest<'_>) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroqClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GroqClient {
    pub fn new(endpoint: String, model: String, api_key: String) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete_json(&self, request: ChatRequest<'_>) -> Result<String, LlmError> {
        let payload = CompletionPayload {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: request.system,
                },
                Message {
                    role: "user",
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(
            model = %self.model,
            prompt_len = request.user.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(status.as_u16(), body));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::Empty)
    }
}
