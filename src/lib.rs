//! ArcSFV Library
//!
//! Parallel file-integrity engine: computes and verifies per-file 64-bit
//! digests over large file trees, persisting them in a checksum manifest.

pub mod config;
pub mod digest;
pub mod engine;
pub mod fs;
pub mod manifest;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use utils::errors::EngineError;
pub type Result<T> = std::result::Result<T, EngineError>;
