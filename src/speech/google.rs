//! Google Speech Provider
//!
//! Cloud transcription using the Google Cloud Speech REST API, keyed by
//! the same API key as the Gemini analysis calls.

use super::{SpeechConfig, SpeechError, SpeechProvider, Transcript};
use crate::audio::{pcm16_bytes, SPEECH_SAMPLE_RATE};
use crate::config::{gemini_api_key, has_api_key};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const GOOGLE_SPEECH_API_URL: &str = "https://speech.googleapis.com/v1";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Google Cloud Speech transcription provider
pub struct GoogleSpeechProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    api_key_override: Option<String>,
}

impl GoogleSpeechProvider {
    /// Create a provider with the default timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT_SECONDS)
    }

    /// Create a provider with a custom request timeout
    pub fn with_timeout(timeout_seconds: u64) -> Self {
        let timeout = Duration::from_secs(timeout_seconds);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: GOOGLE_SPEECH_API_URL.to_string(),
            timeout,
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

    /// The configured request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn api_key(&self) -> Result<String, SpeechError> {
        if let Some(key) = &self.api_key_override {
            return Ok(key.clone());
        }
        gemini_api_key().map_err(|e| SpeechError::Credential(e.to_string()))
    }
}

impl Default for GoogleSpeechProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechProvider for GoogleSpeechProvider {
    async fn transcribe(
        &self,
        samples: &[f32],
        config: &SpeechConfig,
    ) -> Result<Transcript, SpeechError> {
        let api_key = self.api_key()?;
        let start = Instant::now();

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: SPEECH_SAMPLE_RATE,
                language_code: &config.language,
            },
            audio: RecognitionAudio {
                content: BASE64.encode(pcm16_bytes(samples)),
            },
        };

        let response = self
            .client
            .post(format!("{}/speech:recognize", self.base_url))
            .query(&[("key", api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| SpeechError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("Speech API returned {}: {}", status, body);
            return Err(SpeechError::Api(format!("{}: {}", status, body)));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Api(format!("Malformed response: {}", e)))?;

        let mut text = String::new();
        let mut confidence = None;
        for result in &parsed.results {
            if let Some(alt) = result.alternatives.first() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(alt.transcript.trim());
                if confidence.is_none() {
                    confidence = alt.confidence;
                }
            }
        }

        if text.trim().is_empty() {
            return Err(SpeechError::NoSpeech);
        }

        Ok(Transcript {
            text: text.trim().to_string(),
            confidence,
            latency_ms: start.elapsed().as_millis() as u64,
            provider: "google".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "google"
    }

    fn is_available(&self) -> bool {
        self.api_key_override.is_some() || has_api_key()
    }
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Deserialize, Default)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<SpeechResult>,
}

#[derive(Deserialize)]
struct SpeechResult {
    #[serde(default)]
    alternatives: Vec<SpeechAlternative>,
}

#[derive(Deserialize)]
struct SpeechAlternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> String {
        format!("AIza{}", "a".repeat(35))
    }

    #[test]
    fn test_provider_name() {
        let provider = GoogleSpeechProvider::new();
        assert_eq!(provider.name(), "google");
    }

    #[test]
    fn test_custom_timeout() {
        let provider = GoogleSpeechProvider::with_timeout(60);
        assert_eq!(provider.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_is_available_with_override() {
        let provider = GoogleSpeechProvider::new().with_api_key(test_key());
        assert!(provider.is_available());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "results": [
                {"alternatives": [{"transcript": "Ciao mondo", "confidence": 0.93}]}
            ]
        }"#;
        let parsed: RecognizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].alternatives[0].transcript, "Ciao mondo");
    }

    #[test]
    fn test_response_parsing_empty_object() {
        // The API returns {} when nothing was recognized
        let parsed: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }

    #[tokio::test]
    async fn test_transcribe_success_against_mock() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/speech:recognize")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":[{"alternatives":[{"transcript":"Vorrei rilassarmi","confidence":0.9}]}]}"#,
            )
            .create_async()
            .await;

        let provider = GoogleSpeechProvider::new()
            .with_base_url(server.url())
            .with_api_key(test_key());

        let result = provider
            .transcribe(&[0.1; 1600], &SpeechConfig::default())
            .await
            .unwrap();

        assert_eq!(result.text, "Vorrei rilassarmi");
        assert_eq!(result.provider, "google");
        assert_eq!(result.confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_transcribe_empty_result_is_no_speech() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/speech:recognize")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let provider = GoogleSpeechProvider::new()
            .with_base_url(server.url())
            .with_api_key(test_key());

        let result = provider
            .transcribe(&[0.1; 1600], &SpeechConfig::default())
            .await;

        assert!(matches!(result, Err(SpeechError::NoSpeech)));
    }

    #[tokio::test]
    async fn test_transcribe_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/speech:recognize")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"message":"API key not valid"}}"#)
            .create_async()
            .await;

        let provider = GoogleSpeechProvider::new()
            .with_base_url(server.url())
            .with_api_key(test_key());

        let result = provider
            .transcribe(&[0.1; 1600], &SpeechConfig::default())
            .await;

        match result {
            Err(SpeechError::Api(msg)) => assert!(msg.contains("API key not valid")),
            other => panic!("expected Api error, got {:?}", other.map(|t| t.text)),
        }
    }
}
