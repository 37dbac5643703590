//! Flow Analyzer
//!
//! Turns a transcript into a music flow recommendation via Gemini, and
//! produces short conversational replies.

use super::{
    format_categories, strip_code_fences, AnalysisError, FlowRecommendation, GeminiClient,
};
use crate::config::Settings;
use std::time::Instant;

const APOLOGY_NOT_UNDERSTOOD: &str = "Mi dispiace, non ho capito. Puoi ripetere?";
const APOLOGY_ERROR: &str =
    "Mi dispiace, si è verificato un errore nella generazione della risposta.";

/// Gemini-backed analyzer
pub struct FlowAnalyzer {
    gemini: GeminiClient,
}

impl FlowAnalyzer {
    /// Build the analyzer from application settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(GeminiClient::with_timeout(
            settings.analysis.model.clone(),
            settings.analysis.timeout_seconds as u64,
        ))
    }

    /// Build the analyzer around an explicit client
    pub fn new(gemini: GeminiClient) -> Self {
        Self { gemini }
    }

    /// Whether the underlying client has a credential
    pub fn is_available(&self) -> bool {
        self.gemini.is_available()
    }

    /// Build the analysis prompt for the given user text
    pub fn analysis_prompt(text: &str) -> String {
        format!(
            "Analizza il testo utente e genera una raccomandazione musicale in formato JSON.\n\
             Usa SOLO una di queste categorie con le relative caratteristiche:\n\n\
             {categories}\n\n\
             Struttura JSON richiesta:\n\
             {{\n\
             \x20   \"flow_consigliato\": \"nome categoria\",\n\
             \x20   \"bpm_range\": \"range BPM\",\n\
             \x20   \"caratteristiche\": [\"caratteristica1\", \"caratteristica2\"],\n\
             \x20   \"esempi_genere\": [\"genere1\", \"genere2\"],\n\
             \x20   \"percezione_emotiva\": \"breve descrizione emozione rilevata (max 10 parole)\",\n\
             \x20   \"reasoning\": \"spiegazione tecnica della scelta (max 20 parole)\"\n\
             }}\n\n\
             Analizza ora questo input: {text}",
            categories = format_categories(),
            text = text
        )
    }

    /// Analyze user text and return a recommendation.
    /// Failures never propagate: a fallback recommendation carries the
    /// error text instead.
    pub async fn analyze(&self, text: &str) -> FlowRecommendation {
        let start = Instant::now();
        let prompt = Self::analysis_prompt(text);

        match self.request_recommendation(&prompt).await {
            Ok(mut recommendation) => {
                recommendation.latency_ms = start.elapsed().as_millis() as u64;
                recommendation
            }
            Err(e) => {
                tracing::error!("Analysis error: {}", e);
                FlowRecommendation::fallback(
                    &e.to_string(),
                    start.elapsed().as_millis() as u64,
                )
            }
        }
    }

    async fn request_recommendation(
        &self,
        prompt: &str,
    ) -> Result<FlowRecommendation, AnalysisError> {
        let raw = self.gemini.generate(prompt).await?;
        let cleaned = strip_code_fences(&raw);

        serde_json::from_str(&cleaned).map_err(|e| {
            tracing::error!("Invalid JSON in response: {}", e);
            AnalysisError::InvalidJson(e.to_string())
        })
    }

    /// Short Italian reply to arbitrary input. Errors degrade to an
    /// apologetic canned response.
    pub async fn quick_reply(&self, input: &str) -> String {
        match self.gemini.generate(&Self::reply_prompt(input)).await {
            Ok(text) => text,
            Err(AnalysisError::EmptyResponse) => {
                tracing::error!("Empty response from model");
                APOLOGY_NOT_UNDERSTOOD.to_string()
            }
            Err(e) => {
                tracing::error!("Error in quick reply: {}", e);
                APOLOGY_ERROR.to_string()
            }
        }
    }

    /// Streaming variant of [`quick_reply`]: chunks are delivered to
    /// `on_chunk` as they arrive.
    pub async fn quick_reply_streaming(
        &self,
        input: &str,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> String {
        match self
            .gemini
            .generate_streaming(&Self::reply_prompt(input), on_chunk)
            .await
        {
            Ok(text) => text,
            Err(AnalysisError::EmptyResponse) => {
                tracing::error!("Empty response from model");
                APOLOGY_NOT_UNDERSTOOD.to_string()
            }
            Err(e) => {
                tracing::error!("Error in quick reply: {}", e);
                APOLOGY_ERROR.to_string()
            }
        }
    }

    fn reply_prompt(input: &str) -> String {
        format!("Risposta breve in italiano (max 2 righe) a: {}", input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> String {
        format!("AIza{}", "a".repeat(35))
    }

    fn client_for(server: &mockito::Server) -> GeminiClient {
        GeminiClient::new("gemini-2.0-flash-exp")
            .with_base_url(server.url())
            .with_api_key(test_key())
    }

    fn gemini_body(text: &str) -> String {
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
        format!(
            r#"{{"candidates":[{{"content":{{"parts":[{{"text":"{}"}}]}}}}]}}"#,
            escaped
        )
    }

    #[test]
    fn test_prompt_contains_categories_and_input() {
        let prompt = FlowAnalyzer::analysis_prompt("ho corso tutto il giorno");
        assert!(prompt.contains("Running: (120-140 BPM)"));
        assert!(prompt.contains("flow_consigliato"));
        assert!(prompt.ends_with("ho corso tutto il giorno"));
    }

    #[tokio::test]
    async fn test_analyze_parses_fenced_json() {
        let model_reply = "```json\n{\"flow_consigliato\": \"Relaxing\", \"bpm_range\": \"50-70 BPM\", \"caratteristiche\": [\"melodie lente\"], \"esempi_genere\": [\"ambient drone\"], \"percezione_emotiva\": \"stress\", \"reasoning\": \"BPM bassi riducono l'ansia\"}\n```";

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_body(model_reply))
            .create_async()
            .await;

        let analyzer = FlowAnalyzer::new(client_for(&server));
        let rec = analyzer.analyze("giornata stressante").await;

        assert_eq!(rec.flow, "Relaxing");
        assert_eq!(rec.bpm_range, "50-70 BPM");
        assert!(!rec.is_fallback());
    }

    #[tokio::test]
    async fn test_analyze_bad_json_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_body("not json at all"))
            .create_async()
            .await;

        let analyzer = FlowAnalyzer::new(client_for(&server));
        let rec = analyzer.analyze("boh").await;

        assert!(rec.is_fallback());
        assert_eq!(rec.flow, "Relaxing");
    }

    #[tokio::test]
    async fn test_analyze_api_failure_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("server error")
            .create_async()
            .await;

        let analyzer = FlowAnalyzer::new(client_for(&server));
        let rec = analyzer.analyze("boh").await;

        assert!(rec.is_fallback());
        assert!(rec.perceived_emotion.starts_with("Errore:"));
    }

    #[tokio::test]
    async fn test_quick_reply_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_body("Certo, metto subito la playlist."))
            .create_async()
            .await;

        let analyzer = FlowAnalyzer::new(client_for(&server));
        let reply = analyzer.quick_reply("metti musica").await;
        assert_eq!(reply, "Certo, metto subito la playlist.");
    }

    #[tokio::test]
    async fn test_quick_reply_empty_apologizes() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini-2.0-flash-exp:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let analyzer = FlowAnalyzer::new(client_for(&server));
        let reply = analyzer.quick_reply("metti musica").await;
        assert_eq!(reply, APOLOGY_NOT_UNDERSTOOD);
    }
}
