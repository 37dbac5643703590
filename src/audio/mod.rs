//! Audio Module
//!
//! Microphone capture, buffering, and sample processing.

mod buffer;
mod capture;
mod format;

pub use buffer::*;
pub use capture::*;
pub use format::*;
