//! Gemini API Client
//!
//! Text generation via the Google Generative Language REST API, with an
//! SSE streaming variant for incremental display.

use crate::config::{gemini_api_key, has_api_key};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Analysis errors
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("API key missing or invalid: {0}")]
    Credential(String),

    #[error("Gemini API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Invalid JSON in response: {0}")]
    InvalidJson(String),
}

/// Client for the Gemini generateContent endpoints
pub struct GeminiClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key_override: Option<String>,
}

impl GeminiClient {
    /// Create a client for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_timeout(model, DEFAULT_TIMEOUT_SECONDS)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(model: impl Into<String>, timeout_seconds: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            model: model.into(),
            base_url: GEMINI_API_URL.to_string(),
            api_key_override: None,
        }
    }

    /// Override the API base URL (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the API key instead of reading the environment
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key_override = Some(api_key.into());
        self
    }

    /// The configured model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a credential is configured
    pub fn is_available(&self) -> bool {
        self.api_key_override.is_some() || has_api_key()
    }

    fn api_key(&self) -> Result<String, AnalysisError> {
        if let Some(key) = &self.api_key_override {
            return Ok(key.clone());
        }
        gemini_api_key().map_err(|e| AnalysisError::Credential(e.to_string()))
    }

    /// Generate a complete response for the prompt
    pub async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let api_key = self.api_key()?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("Gemini API returned {}: {}", status, body);
            return Err(AnalysisError::Api(format!("{}: {}", status, body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Api(format!("Malformed response: {}", e)))?;

        match parsed.collected_text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AnalysisError::EmptyResponse),
        }
    }

    /// Generate a response as a stream of text chunks over SSE, invoking
    /// `on_chunk` for each piece and returning the full text at the end.
    pub async fn generate_streaming(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, AnalysisError> {
        let api_key = self.api_key()?;

        let url = format!(
            "{}/models/{}:streamGenerateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse"), ("key", api_key.as_str())])
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalysisError::Api(format!("{}: {}", status, body)));
        }

        let mut stream = response.bytes_stream();
        let mut pending = String::new();
        let mut full = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AnalysisError::Network(e.to_string()))?;
            pending.push_str(&String::from_utf8_lossy(&chunk));

            // SSE events are newline-delimited `data: {json}` lines
            while let Some(pos) = pending.find('\n') {
                let line: String = pending.drain(..=pos).collect();
                let line = line.trim();

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() {
                    continue;
                }

                match serde_json::from_str::<GenerateResponse>(data) {
                    Ok(event) => {
                        if let Some(text) = event.collected_text() {
                            full.push_str(&text);
                            on_chunk(&text);
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Skipping unparseable SSE event: {}", e);
                    }
                }
            }
        }

        if full.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        Ok(full)
    }
}

/// Strip the markdown code fences models like to wrap JSON in
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

impl GenerateRequest {
    fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenate the text parts of the first candidate
    fn collected_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
