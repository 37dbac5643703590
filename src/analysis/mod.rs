//! Analysis Module
//!
//! Gemini-backed emotional analysis and music flow recommendations.

mod analyzer;
mod categories;
mod gemini;
mod recommendation;

pub use analyzer::*;
pub use categories::*;
pub use gemini::*;
pub use recommendation::*;
