//! Session Metrics
//!
//! Latency accounting for the record -> transcribe -> analyze pipeline.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

/// Maximum number of interaction records to keep
const MAX_RECORDS: usize = 100;

/// Global metrics instance
static METRICS: once_cell::sync::Lazy<RwLock<SessionMetrics>> =
    once_cell::sync::Lazy::new(|| RwLock::new(SessionMetrics::new()));

/// Get the global metrics instance
pub fn metrics() -> &'static RwLock<SessionMetrics> {
    &METRICS
}

/// Record of a single interaction
#[derive(Debug, Clone, Serialize)]
pub struct InteractionRecord {
    /// Timestamp when the interaction started (unix ms)
    pub timestamp_ms: u64,
    /// Duration of the recorded audio (ms)
    pub audio_ms: u64,
    /// Speech recognition latency (ms)
    pub speech_ms: u64,
    /// Analysis latency (ms)
    pub analysis_ms: u64,
    /// Characters in the transcript
    pub transcript_chars: usize,
    /// Whether the analysis fell back to the default recommendation
    pub fallback: bool,
}

impl InteractionRecord {
    /// Create a record stamped with the current time
    pub fn new(audio_ms: u64, speech_ms: u64, analysis_ms: u64) -> Self {
        Self {
            timestamp_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            audio_ms,
            speech_ms,
            analysis_ms,
            transcript_chars: 0,
            fallback: false,
        }
    }

    pub fn transcript_chars(mut self, chars: usize) -> Self {
        self.transcript_chars = chars;
        self
    }

    pub fn fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Total pipeline latency (ms)
    pub fn total_ms(&self) -> u64 {
        self.speech_ms + self.analysis_ms
    }
}

/// Session metrics collector
pub struct SessionMetrics {
    records: VecDeque<InteractionRecord>,
    session_start: Instant,
}

impl SessionMetrics {
    /// Create a new collector
    pub fn new() -> Self {
        Self {
            records: VecDeque::with_capacity(MAX_RECORDS),
            session_start: Instant::now(),
        }
    }

    /// Record an interaction
    pub fn record(&mut self, record: InteractionRecord) {
        if self.records.len() >= MAX_RECORDS {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Recent records, newest first
    pub fn recent(&self, count: usize) -> Vec<InteractionRecord> {
        self.records.iter().rev().take(count).cloned().collect()
    }

    /// Summary statistics for the session
    pub fn summary(&self) -> MetricsSummary {
        let count = self.records.len();
        if count == 0 {
            return MetricsSummary::default();
        }

        let total_speech: u64 = self.records.iter().map(|r| r.speech_ms).sum();
        let total_analysis: u64 = self.records.iter().map(|r| r.analysis_ms).sum();
        let fallback_count = self.records.iter().filter(|r| r.fallback).count();

        let mut totals: Vec<u64> = self.records.iter().map(|r| r.total_ms()).collect();
        totals.sort_unstable();

        let p95_idx = ((count as f64 * 0.95) as usize).min(count - 1);

        MetricsSummary {
            interaction_count: count,
            session_duration_ms: self.session_start.elapsed().as_millis() as u64,
            avg_speech_ms: total_speech / count as u64,
            avg_analysis_ms: total_analysis / count as u64,
            fastest_ms: *totals.first().unwrap_or(&0),
            slowest_ms: *totals.last().unwrap_or(&0),
            p95_ms: totals[p95_idx],
            fallback_count,
        }
    }

    /// Reset all recorded data
    pub fn reset(&mut self) {
        self.records.clear();
        self.session_start = Instant::now();
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of session metrics
#[derive(Debug, Clone, Serialize, Default)]
pub struct MetricsSummary {
    pub interaction_count: usize,
    pub session_duration_ms: u64,
    pub avg_speech_ms: u64,
    pub avg_analysis_ms: u64,
    pub fastest_ms: u64,
    pub slowest_ms: u64,
    pub p95_ms: u64,
    pub fallback_count: usize,
}
