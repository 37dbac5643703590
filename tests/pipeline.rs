//! End-to-end pipeline tests with synthetic audio and mocked backends.

use async_trait::async_trait;
use flowvoice::analysis::{FlowAnalyzer, GeminiClient};
use flowvoice::audio::SPEECH_SAMPLE_RATE;
use flowvoice::config::Settings;
use flowvoice::speech::{SpeechConfig, SpeechError, SpeechProvider, SpeechService, Transcript};
use flowvoice::{AssistantError, AssistantService};

/// Synthetic voice-like signal: a few harmonics under a slow envelope,
/// loud enough to clear the silence gate.
fn speech_like(seconds: f32, sample_rate: u32) -> Vec<f32> {
    let count = (seconds * sample_rate as f32) as usize;
    (0..count)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let envelope = 0.5 + 0.5 * (t * 3.0).sin().abs();
            let voice = (t * 2.0 * std::f32::consts::PI * 140.0).sin() * 0.4
                + (t * 2.0 * std::f32::consts::PI * 280.0).sin() * 0.2
                + (t * 2.0 * std::f32::consts::PI * 560.0).sin() * 0.1;
            voice * envelope
        })
        .collect()
}

struct ScriptedProvider {
    text: &'static str,
}

#[async_trait]
impl SpeechProvider for ScriptedProvider {
    async fn transcribe(
        &self,
        samples: &[f32],
        config: &SpeechConfig,
    ) -> Result<Transcript, SpeechError> {
        assert!(!samples.is_empty());
        assert_eq!(config.language, "it-IT");
        Ok(Transcript {
            text: self.text.to_string(),
            confidence: Some(0.93),
            latency_ms: 21,
            provider: "scripted".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn test_key() -> String {
    format!("AIza{}", "b".repeat(35))
}

fn assistant_for(server: &mockito::Server, transcript: &'static str) -> AssistantService {
    let speech = SpeechService::with_provider(Box::new(ScriptedProvider { text: transcript }));
    let analyzer = FlowAnalyzer::new(
        GeminiClient::new("gemini-2.0-flash-exp")
            .with_base_url(server.url())
            .with_api_key(test_key()),
    );
    AssistantService::with_parts(speech, analyzer, Settings::default())
}

fn recommendation_body(flow: &str, bpm: &str) -> String {
    let json = format!(
        "{{\\\"flow_consigliato\\\": \\\"{}\\\", \\\"bpm_range\\\": \\\"{}\\\", \\\"caratteristiche\\\": [\\\"ritmo costante\\\"], \\\"esempi_genere\\\": [\\\"elettronica\\\"], \\\"percezione_emotiva\\\": \\\"energia\\\", \\\"reasoning\\\": \\\"testo orientato al movimento\\\"}}",
        flow, bpm
    );
    format!(
        r#"{{"candidates":[{{"content":{{"parts":[{{"text":"{}"}}]}}}}]}}"#,
        json
    )
}

#[tokio::test]
async fn full_pipeline_produces_recommendation() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(recommendation_body("Running", "120-140 BPM"))
        .create_async()
        .await;

    let assistant = assistant_for(&server, "Sto Andando A Correre");
    let samples = speech_like(2.0, 44_100);

    let outcome = assistant.process(&samples, 44_100).await.unwrap();

    assert_eq!(outcome.transcript, "sto andando a correre");
    assert_eq!(outcome.recommendation.flow, "Running");
    assert_eq!(outcome.recommendation.bpm_range, "120-140 BPM");
    assert!(!outcome.recommendation.is_fallback());
    assert_eq!(outcome.speech_ms, 21);
}

#[tokio::test]
async fn silence_is_rejected_before_transcription() {
    let server = mockito::Server::new_async().await;
    let assistant = assistant_for(&server, "never used");

    let silence = vec![0.0_f32; SPEECH_SAMPLE_RATE as usize * 2];
    let result = assistant.process(&silence, SPEECH_SAMPLE_RATE).await;

    assert!(matches!(result, Err(AssistantError::NoSpeech)));
}

#[tokio::test]
async fn short_recording_is_rejected() {
    let server = mockito::Server::new_async().await;
    let assistant = assistant_for(&server, "never used");

    let blip = speech_like(0.05, SPEECH_SAMPLE_RATE);
    let result = assistant.process(&blip, SPEECH_SAMPLE_RATE).await;

    assert!(matches!(result, Err(AssistantError::TooShort)));
}

#[tokio::test]
async fn analysis_failure_degrades_to_fallback() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"non sono json"}]}}]}"#)
        .create_async()
        .await;

    let assistant = assistant_for(&server, "qualcosa di strano");
    let samples = speech_like(1.0, SPEECH_SAMPLE_RATE);

    let outcome = assistant.process(&samples, SPEECH_SAMPLE_RATE).await.unwrap();

    assert!(outcome.recommendation.is_fallback());
    assert_eq!(outcome.recommendation.flow, "Relaxing");
    assert_eq!(outcome.recommendation.bpm_range, "60-80 BPM");
}

#[tokio::test]
async fn typed_text_uses_analysis_only() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(recommendation_body("Kitchen", "80-100 BPM"))
        .create_async()
        .await;

    let assistant = assistant_for(&server, "never used");
    let outcome = assistant.process_text("Sto cucinando la cena").await;

    assert_eq!(outcome.transcript, "sto cucinando la cena");
    assert_eq!(outcome.recommendation.flow, "Kitchen");
    assert_eq!(outcome.speech_ms, 0);
}
