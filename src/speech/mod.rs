//! Speech Module
//!
//! Hosted speech-to-text.

mod google;
mod provider;
mod service;

pub use google::*;
pub use provider::*;
pub use service::*;
