//! Speech Provider Trait
//!
//! Common interface for speech-to-text backends.

use async_trait::async_trait;

/// Configuration for a transcription request
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// BCP-47 language code (e.g. "it-IT")
    pub language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "it-IT".to_string(),
        }
    }
}

/// Result of a transcription
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Recognized text
    pub text: String,
    /// Recognition confidence reported by the API, if any
    pub confidence: Option<f32>,
    /// Request latency in milliseconds
    pub latency_ms: u64,
    /// Provider that produced the transcript
    pub provider: String,
}

/// Speech recognition errors
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("API key missing or invalid: {0}")]
    Credential(String),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Speech API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No speech recognized")]
    NoSpeech,
}

/// Trait for speech-to-text providers
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Transcribe 16 kHz mono f32 samples to text
    async fn transcribe(
        &self,
        samples: &[f32],
        config: &SpeechConfig,
    ) -> Result<Transcript, SpeechError>;

    /// Provider name
    fn name(&self) -> &'static str;

    /// Whether the provider is configured and usable
    fn is_available(&self) -> bool;
}
