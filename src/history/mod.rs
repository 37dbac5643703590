//! History Module
//!
//! Store and retrieve past interactions (transcript + recommendation).

use crate::analysis::FlowRecommendation;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default cap on stored history entries
const DEFAULT_MAX_ENTRIES: usize = 100;

fn default_capacity() -> usize {
    DEFAULT_MAX_ENTRIES
}

/// Global history instance
static HISTORY: OnceLock<RwLock<InteractionHistory>> = OnceLock::new();

/// A single interaction in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEntry {
    /// Unique identifier
    pub id: String,
    /// RFC 3339 timestamp of the interaction
    pub timestamp: String,
    /// What the user said (lowercased transcript)
    pub transcript: String,
    /// The recommendation produced for it
    pub recommendation: FlowRecommendation,
    /// Speech recognition latency in milliseconds
    pub speech_ms: u64,
    /// Speech provider used
    pub provider: String,
    /// Path to the recorded audio, if kept
    #[serde(default)]
    pub audio_path: Option<String>,
}

/// Interaction history storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionHistory {
    entries: VecDeque<InteractionEntry>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
}

impl Default for InteractionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionHistory {
    /// Create a new empty history
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Load history from disk; a missing or corrupt file yields an
    /// empty history rather than an error.
    pub fn load() -> Self {
        Self::load_from(&history_file_path())
    }

    /// Load history from an explicit path
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<InteractionHistory>(&content) {
                    Ok(history) => {
                        tracing::info!("Loaded {} history entries", history.len());
                        return history;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse history file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read history file: {}", e);
                }
            }
        }
        Self::new()
    }

    /// Save history to disk
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&history_file_path())
    }

    /// Save history to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        std::fs::write(path, content)?;
        tracing::debug!("History saved to {:?}", path);
        Ok(())
    }

    /// Add a new entry, evicting the oldest past capacity
    pub fn add(&mut self, entry: InteractionEntry) {
        while self.entries.len() >= self.capacity.max(1) {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Cap the number of stored entries, evicting the oldest if the
    /// history already exceeds the new capacity
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Current entry cap
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recent `count` entries, newest first
    pub fn recent(&self, count: usize) -> Vec<InteractionEntry> {
        self.entries.iter().take(count).cloned().collect()
    }

    /// All entries, newest first
    pub fn entries(&self) -> Vec<InteractionEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Get entry by ID
    pub fn get(&self, id: &str) -> Option<InteractionEntry> {
        self.entries.iter().find(|e| e.id == id).cloned()
    }

    /// Delete entry by ID; returns whether anything was removed
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Path of the persisted history file
fn history_file_path() -> PathBuf {
    crate::config::data_dir().join("history.json")
}

/// Directory holding recorded audio files
pub fn audio_dir() -> PathBuf {
    crate::config::data_dir().join("audio")
}

/// Save samples as a WAV file named after the entry id
pub fn save_audio_file(
    samples: &[f32],
    sample_rate: u32,
    id: &str,
) -> Result<PathBuf, std::io::Error> {
    let dir = audio_dir();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.wav", id));

    let wav = crate::audio::encode_wav(samples, sample_rate)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(&path, wav)?;

    tracing::debug!("Audio saved to {:?}", path);
    Ok(path)
}

/// Get or initialize the global history instance
pub fn history() -> &'static RwLock<InteractionHistory> {
    HISTORY.get_or_init(|| RwLock::new(InteractionHistory::load()))
}

/// Record an interaction, optionally persisting its audio next to it
pub fn record_interaction(
    transcript: String,
    recommendation: FlowRecommendation,
    speech_ms: u64,
    provider: String,
    audio: Option<(&[f32], u32)>,
) -> InteractionEntry {
    let id = uuid::Uuid::new_v4().to_string();

    let audio_path = audio.and_then(|(samples, rate)| {
        match save_audio_file(samples, rate, &id) {
            Ok(path) => Some(path.to_string_lossy().to_string()),
            Err(e) => {
                tracing::error!("Failed to save audio file: {}", e);
                None
            }
        }
    });

    let entry = InteractionEntry {
        id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        transcript,
        recommendation,
        speech_ms,
        provider,
        audio_path,
    };

    {
        let mut history = history().write();
        history.add(entry.clone());
        if let Err(e) = history.save() {
            tracing::error!("Failed to save history: {}", e);
        }
    }

    entry
}
