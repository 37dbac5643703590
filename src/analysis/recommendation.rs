//! Flow Recommendation
//!
//! The structured result returned by the analyzer. Field names on the
//! wire are the Italian keys the model is instructed to produce.

use serde::{Deserialize, Serialize};

/// Music flow recommendation produced by the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecommendation {
    /// Recommended flow category name
    #[serde(rename = "flow_consigliato")]
    pub flow: String,

    /// BPM range of the recommended flow
    #[serde(rename = "bpm_range")]
    pub bpm_range: String,

    /// Musical characteristics supporting the choice
    #[serde(rename = "caratteristiche")]
    pub characteristics: Vec<String>,

    /// Example genres to play
    #[serde(rename = "esempi_genere")]
    pub genre_examples: Vec<String>,

    /// Short description of the detected emotion
    #[serde(rename = "percezione_emotiva")]
    pub perceived_emotion: String,

    /// Technical reasoning for the choice
    pub reasoning: String,

    /// End-to-end analysis latency, stamped after the request completes
    #[serde(rename = "latenza_ms", default)]
    pub latency_ms: u64,
}

impl FlowRecommendation {
    /// Fallback recommendation used when the analysis fails for any
    /// reason; the pipeline never surfaces analysis errors to the user.
    pub fn fallback(error: &str, latency_ms: u64) -> Self {
        Self {
            flow: "Relaxing".to_string(),
            bpm_range: "60-80 BPM".to_string(),
            characteristics: vec!["fallback_mode".to_string()],
            genre_examples: vec!["ambient".to_string()],
            perceived_emotion: format!("Errore: {}", error),
            reasoning: "Risposta di fallback a causa di un errore".to_string(),
            latency_ms,
        }
    }

    /// Whether this recommendation is the error fallback
    pub fn is_fallback(&self) -> bool {
        self.characteristics.iter().any(|c| c == "fallback_mode")
    }
}
