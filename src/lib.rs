//! FlowVoice Library
//!
//! Voice-driven music mood assistant: microphone capture, hosted
//! speech-to-text, and Gemini-backed flow recommendations.

pub mod analysis;
pub mod assistant;
pub mod audio;
pub mod cli;
pub mod config;
pub mod history;
pub mod speech;
pub mod utils;

pub use assistant::{AssistantError, AssistantService, InteractionOutcome};
