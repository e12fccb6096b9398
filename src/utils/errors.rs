//! Custom error types for the integrity engine.
//!
//! Per-file failures are never errors: they end up as a job status and the
//! run continues. Everything here is fatal to a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest parse error in {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Failed to write manifest {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Manifest {} contains no entries", .0.display())]
    EmptyManifest(PathBuf),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
