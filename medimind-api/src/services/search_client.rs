//! Tavily web search client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SEARCH_TIMEOUT_SECS: u64 = 30;
const MAX_RESULTS: u32 = 3;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl SearchResponse {
    /// Summary plus up to three sources, as prompt context
    pub fn to_context(&self) -> String {
        let mut blocks = Vec::new();

        if let Some(answer) = self.answer.as_deref().filter(|a| !a.is_empty()) {
            blocks.push(format!("Summary: {}", answer));
        }

        for result in self.results.iter().take(MAX_RESULTS as usize) {
            blocks.push(format!(
                "Source: {}\n{}",
                result.title.as_deref().unwrap_or("Unknown"),
                result.content.as_deref().unwrap_or("")
            ));
        }

        blocks.join("\n\n")
    }
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError>;
}

#[derive(Serialize)]
struct SearchPayload<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: u32,
    include_answer: bool,
}

pub struct TavilyClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TavilyClient {
    pub fn new(endpoint: String, api_key: String) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let payload = SearchPayload {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            max_results: MAX_RESULTS,
            include_answer: true,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_formatting() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "answer": "Usually 500mg twice daily.",
                "results": [
                    {"title": "Drug A", "content": "Take with food."},
                    {"content": "No title here."},
                    {"title": "C", "content": "c"},
                    {"title": "D", "content": "dropped"}
                ]
            }"#,
        )
        .unwrap();

        let context = response.to_context();
        assert!(context.starts_with("Summary: Usually 500mg twice daily.\n\nSource: Drug A\nTake with food."));
        assert!(context.contains("Source: Unknown\nNo title here."));
        assert!(!context.contains("dropped"));
    }

    #[test]
    fn test_empty_response_gives_empty_context() {
        assert_eq!(SearchResponse::default().to_context(), "");
    }
}
