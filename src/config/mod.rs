//! Configuration Module
//!
//! Application settings, persistence, and credential access.

mod secrets;
mod settings;
mod store;

pub use secrets::*;
pub use settings::*;
pub use store::*;
