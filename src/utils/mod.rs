//! Utilities
//!
//! Session metrics.

mod metrics;

pub use metrics::*;
