//! Speech Service
//!
//! Wraps the active provider with status tracking and input checks.

use super::{GoogleSpeechProvider, SpeechConfig, SpeechError, SpeechProvider, Transcript};
use crate::config::Settings;
use parking_lot::RwLock;

/// Reject recordings shorter than this many 16 kHz samples (100 ms)
const MIN_SAMPLES: usize = 1600;

/// Speech recognition status information
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SpeechStatus {
    pub provider: String,
    pub is_transcribing: bool,
    pub last_transcript: Option<String>,
    pub last_latency_ms: Option<u64>,
    pub last_error: Option<String>,
}

/// Speech recognition service
pub struct SpeechService {
    provider: Box<dyn SpeechProvider>,
    status: RwLock<SpeechStatus>,
}

impl SpeechService {
    /// Build the service from application settings
    pub fn from_settings(settings: &Settings) -> Self {
        let provider = GoogleSpeechProvider::with_timeout(
            settings.speech.timeout_seconds as u64,
        );
        Self::with_provider(Box::new(provider))
    }

    /// Build the service around an explicit provider
    pub fn with_provider(provider: Box<dyn SpeechProvider>) -> Self {
        let status = SpeechStatus {
            provider: provider.name().to_string(),
            ..SpeechStatus::default()
        };
        Self {
            provider,
            status: RwLock::new(status),
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> SpeechStatus {
        self.status.read().clone()
    }

    /// Whether the underlying provider is usable
    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    /// Transcribe 16 kHz mono samples
    pub async fn transcribe(
        &self,
        samples: &[f32],
        config: &SpeechConfig,
    ) -> Result<Transcript, SpeechError> {
        if samples.len() < MIN_SAMPLES {
            return Err(SpeechError::InvalidAudio(
                "Recording too short".to_string(),
            ));
        }

        {
            let mut status = self.status.write();
            status.is_transcribing = true;
            status.last_error = None;
        }

        let result = self.provider.transcribe(samples, config).await;

        {
            let mut status = self.status.write();
            status.is_transcribing = false;
            match &result {
                Ok(transcript) => {
                    status.last_transcript = Some(transcript.text.clone());
                    status.last_latency_ms = Some(transcript.latency_ms);
                }
                Err(e) => {
                    status.last_error = Some(e.to_string());
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProvider {
        text: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl SpeechProvider for FixedProvider {
        async fn transcribe(
            &self,
            _samples: &[f32],
            _config: &SpeechConfig,
        ) -> Result<Transcript, SpeechError> {
            if self.fail {
                Err(SpeechError::Api("boom".to_string()))
            } else {
                Ok(Transcript {
                    text: self.text.to_string(),
                    confidence: Some(0.8),
                    latency_ms: 42,
                    provider: "fixed".to_string(),
                })
            }
        }

        fn name(&self) -> &'static str {
            "fixed"
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_short_audio_rejected_before_provider() {
        let service = SpeechService::with_provider(Box::new(FixedProvider {
            text: "ciao",
            fail: false,
        }));

        let result = service.transcribe(&[0.1; 100], &SpeechConfig::default()).await;
        assert!(matches!(result, Err(SpeechError::InvalidAudio(_))));
    }

    #[tokio::test]
    async fn test_status_reflects_success() {
        let service = SpeechService::with_provider(Box::new(FixedProvider {
            text: "ciao mondo",
            fail: false,
        }));

        let result = service
            .transcribe(&[0.1; MIN_SAMPLES], &SpeechConfig::default())
            .await
            .unwrap();
        assert_eq!(result.text, "ciao mondo");

        let status = service.status();
        assert_eq!(status.provider, "fixed");
        assert!(!status.is_transcribing);
        assert_eq!(status.last_transcript.as_deref(), Some("ciao mondo"));
        assert_eq!(status.last_latency_ms, Some(42));
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_status_reflects_failure() {
        let service = SpeechService::with_provider(Box::new(FixedProvider {
            text: "",
            fail: true,
        }));

        let result = service
            .transcribe(&[0.1; MIN_SAMPLES], &SpeechConfig::default())
            .await;
        assert!(result.is_err());

        let status = service.status();
        assert!(status.last_error.unwrap().contains("boom"));
        assert!(status.last_transcript.is_none());
    }
}
