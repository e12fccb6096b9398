//! Utility modules for the integrity engine.

pub mod errors;
pub mod logger;

pub use errors::{EngineError, Result};
