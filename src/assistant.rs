//! Assistant Service
//!
//! Orchestrates the full interaction pipeline: resample captured audio,
//! transcribe it, analyze the transcript, and record the outcome.

use crate::analysis::{FlowAnalyzer, FlowRecommendation};
use crate::audio::{self, SPEECH_SAMPLE_RATE};
use crate::config::Settings;
use crate::history;
use crate::speech::{SpeechConfig, SpeechError, SpeechService};
use crate::utils::{metrics, InteractionRecord};
use std::time::Instant;

/// Minimum usable recording length at 16 kHz (100 ms)
const MIN_SPEECH_SAMPLES: usize = 1600;

/// Pipeline errors surfaced to the user
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("Recording too short, hold the microphone a bit longer")]
    TooShort,

    #[error("Audio non chiaro, per favore riprova.")]
    NoSpeech,

    #[error(transparent)]
    Speech(#[from] SpeechError),
}

/// Result of one voice interaction
#[derive(Debug, Clone, serde::Serialize)]
pub struct InteractionOutcome {
    /// Lowercased transcript of what was said
    pub transcript: String,
    /// The recommendation produced for it
    pub recommendation: FlowRecommendation,
    /// Speech recognition latency in milliseconds
    pub speech_ms: u64,
    /// Analysis latency in milliseconds
    pub analysis_ms: u64,
}

/// The assistant pipeline
pub struct AssistantService {
    speech: SpeechService,
    analyzer: FlowAnalyzer,
    settings: Settings,
    persist: bool,
}

impl AssistantService {
    /// Build the full pipeline from application settings
    pub fn new(settings: Settings) -> Self {
        history::history()
            .write()
            .set_capacity(settings.history.max_entries);

        Self {
            speech: SpeechService::from_settings(&settings),
            analyzer: FlowAnalyzer::from_settings(&settings),
            settings,
            persist: true,
        }
    }

    /// Build from explicit parts without persisting history (tests)
    pub fn with_parts(speech: SpeechService, analyzer: FlowAnalyzer, settings: Settings) -> Self {
        Self {
            speech,
            analyzer,
            settings,
            persist: false,
        }
    }

    /// Whether both backends have credentials
    pub fn is_available(&self) -> bool {
        self.speech.is_available() && self.analyzer.is_available()
    }

    /// Run the full pipeline on raw captured samples.
    ///
    /// The audio is resampled to 16 kHz, rejected if too short or too
    /// quiet, transcribed, and the lowercased transcript analyzed. The
    /// analysis never fails: on error the outcome carries a fallback
    /// recommendation instead.
    pub async fn process(
        &self,
        raw_samples: &[f32],
        device_rate: u32,
    ) -> Result<InteractionOutcome, AssistantError> {
        let mut samples = audio::resample(raw_samples, device_rate, SPEECH_SAMPLE_RATE)
            .map_err(SpeechError::InvalidAudio)?;

        if samples.len() < MIN_SPEECH_SAMPLES {
            return Err(AssistantError::TooShort);
        }

        if !audio::has_speech(&samples, self.settings.speech.min_rms) {
            tracing::info!(
                "Recording rejected as silence (rms below {})",
                self.settings.speech.min_rms
            );
            return Err(AssistantError::NoSpeech);
        }

        // The silence gate runs on the raw level; only then bring quiet
        // recordings up to full scale for the recognizer
        audio::normalize(&mut samples);

        let config = SpeechConfig {
            language: self.settings.speech.language.clone(),
        };
        let transcript = match self.speech.transcribe(&samples, &config).await {
            Ok(transcript) => transcript,
            // The API recognizing nothing gets the same friendly retry
            // message as a silent recording
            Err(SpeechError::NoSpeech) => return Err(AssistantError::NoSpeech),
            Err(e) => return Err(e.into()),
        };
        let text = transcript.text.to_lowercase();
        tracing::info!("Transcript: {:?}", text);

        let analysis_start = Instant::now();
        let recommendation = self.analyzer.analyze(&text).await;
        let analysis_ms = analysis_start.elapsed().as_millis() as u64;

        let audio_ms = audio::duration_ms(samples.len(), SPEECH_SAMPLE_RATE);
        metrics().write().record(
            InteractionRecord::new(audio_ms, transcript.latency_ms, analysis_ms)
                .transcript_chars(text.chars().count())
                .fallback(recommendation.is_fallback()),
        );

        if self.persist {
            let audio = self
                .settings
                .history
                .keep_audio
                .then_some((samples.as_slice(), SPEECH_SAMPLE_RATE));
            history::record_interaction(
                text.clone(),
                recommendation.clone(),
                transcript.latency_ms,
                transcript.provider.clone(),
                audio,
            );
        }

        Ok(InteractionOutcome {
            transcript: text,
            recommendation,
            speech_ms: transcript.latency_ms,
            analysis_ms,
        })
    }

    /// Analyze typed text, skipping the audio stages
    pub async fn process_text(&self, text: &str) -> InteractionOutcome {
        let text = text.to_lowercase();

        let analysis_start = Instant::now();
        let recommendation = self.analyzer.analyze(&text).await;
        let analysis_ms = analysis_start.elapsed().as_millis() as u64;

        metrics().write().record(
            InteractionRecord::new(0, 0, analysis_ms)
                .transcript_chars(text.chars().count())
                .fallback(recommendation.is_fallback()),
        );

        if self.persist {
            history::record_interaction(
                text.clone(),
                recommendation.clone(),
                0,
                "text".to_string(),
                None,
            );
        }

        InteractionOutcome {
            transcript: text,
            recommendation,
            speech_ms: 0,
            analysis_ms,
        }
    }

    /// Short conversational reply to typed text
    pub async fn reply(&self, input: &str) -> String {
        self.analyzer.quick_reply(input).await
    }

    /// Streaming variant of [`reply`]
    pub async fn reply_streaming(
        &self,
        input: &str,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> String {
        self.analyzer.quick_reply_streaming(input, on_chunk).await
    }
}
