//! OCR.space client
//!
//! Uploads the prescription image and concatenates the text of every page
//! that parsed successfully.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const OCR_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR_SPACE_API_KEY not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("OCR.space API returned status {0}")]
    Status(u16),

    #[error("OCR.space processing error: {message} - {details}")]
    Processing { message: String, details: String },

    #[error("No parsed results returned from OCR.space")]
    NoResults,

    #[error("No text extracted from image")]
    EmptyText,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Image-to-text engine
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, image: &[u8], filename: &str) -> Result<String, OcrError>;
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored: bool,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<serde_json::Value>,
    #[serde(rename = "ErrorDetails", default)]
    error_details: Option<serde_json::Value>,
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "FileParseExitCode", default)]
    exit_code: Option<i64>,
    #[serde(rename = "ParsedText", default)]
    text: Option<String>,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<serde_json::Value>,
}

/// OCR.space reports messages either as a string or a list of strings
fn message_text(value: Option<&serde_json::Value>, fallback: &str) -> String {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
        Some(serde_json::Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        _ => fallback.to_string(),
    }
}

pub struct OcrSpaceClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OcrSpaceClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self, OcrError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(OCR_TIMEOUT_SECS))
            .build()
            .map_err(|e| OcrError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl OcrEngine for OcrSpaceClient {
    async fn extract_text(&self, image: &[u8], filename: &str) -> Result<String, OcrError> {
        let api_key = self.api_key.as_deref().ok_or(OcrError::NotConfigured)?;

        let part = Part::bytes(image.to_vec())
            .file_name(filename.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| OcrError::Network(e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("apikey", api_key.to_string())
            .text("language", "eng")
            .text("isOverlayRequired", "false")
            .text("OCREngine", "2")
            .text("scale", "true")
            .text("isTable", "false");

        debug!("Sending {} byte image to OCR.space", image.len());

        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OcrError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::Status(status.as_u16()));
        }

        let body: OcrResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Parse(e.to_string()))?;

        let text = collect_text(body)?;
        info!("OCR extracted {} characters", text.chars().count());
        Ok(text)
    }
}

fn collect_text(body: OcrResponse) -> Result<String, OcrError> {
    if body.is_errored {
        return Err(OcrError::Processing {
            message: message_text(body.error_message.as_ref(), "Unknown error"),
            details: message_text(body.error_details.as_ref(), ""),
        });
    }

    let results = body.parsed_results.unwrap_or_default();
    if results.is_empty() {
        return Err(OcrError::NoResults);
    }

    let mut extracted = String::new();
    for page in results {
        if page.exit_code == Some(1) {
            extracted.push_str(page.text.as_deref().unwrap_or(""));
            extracted.push('\n');
        } else {
            warn!(
                "OCR page parse failed: {}",
                message_text(page.error_message.as_ref(), "Parse failed")
            );
        }
    }

    if extracted.trim().is_empty() {
        return Err(OcrError::EmptyText);
    }

    Ok(extracted)
}
