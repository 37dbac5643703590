//! Settings Definition
//!
//! Application configuration schema.

use serde::{Deserialize, Serialize};

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub recording: RecordingSettings,
    pub speech: SpeechSettings,
    pub analysis: AnalysisSettings,
    pub history: HistorySettings,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.recording.max_duration_secs == 0 {
            return Err(SettingsError::Invalid(
                "recording.max_duration_secs must be greater than zero".to_string(),
            ));
        }

        if self.speech.language.is_empty() {
            return Err(SettingsError::Invalid(
                "speech.language must not be empty".to_string(),
            ));
        }

        if self.speech.timeout_seconds == 0 || self.analysis.timeout_seconds == 0 {
            return Err(SettingsError::Invalid(
                "request timeouts must be greater than zero".to_string(),
            ));
        }

        if self.analysis.model.is_empty() {
            return Err(SettingsError::Invalid(
                "analysis.model must not be empty".to_string(),
            ));
        }

        if self.history.max_entries == 0 {
            return Err(SettingsError::Invalid(
                "history.max_entries must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Load settings from disk
    pub fn load() -> Result<Self, SettingsError> {
        super::store::load_settings()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), SettingsError> {
        super::store::save_settings(self)
    }
}

/// Recording behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Maximum recording duration in seconds
    pub max_duration_secs: u32,
    /// Input device name (None = default)
    pub input_device: Option<String>,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            max_duration_secs: 30,
            input_device: None,
        }
    }
}

/// Speech recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// BCP-47 language code sent to the speech API
    pub language: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// RMS level below which a recording is rejected as silence
    pub min_rms: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            language: "it-IT".to_string(),
            timeout_seconds: 30,
            min_rms: 0.01,
        }
    }
}

/// Gemini analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Gemini model identifier
    pub model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Interaction history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum number of stored interactions
    pub max_entries: usize,
    /// How many recent interactions the CLI shows by default
    pub recent_shown: usize,
    /// Keep the recorded audio next to each entry
    pub keep_audio: bool,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_entries: 100,
            recent_shown: 5,
            keep_audio: true,
        }
    }
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),
}
