//! Manifest codecs: the persisted integrity database.
//!
//! Two independent wire formats are supported. The text format is
//! canonical for writing; both are readable, auto-detected by
//! sniffing the binary magic. Either format round-trips `rel_path`, `size`
//! and digest (the text format recovers `size` from disk on load).

pub mod binary;
pub mod text;

use crate::utils::errors::{EngineError, Result};
use std::path::Path;

/// One recorded file: relative path, size and digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// `/`-separated path relative to the manifest's directory.
    pub rel_path: String,
    pub size: u64,
    pub digest: u64,
}

/// Wire format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Text,
    Binary,
}

impl ManifestFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ManifestFormat::Text => "arca",
            ManifestFormat::Binary => "arcb",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "text" => Ok(ManifestFormat::Text),
            "binary" => Ok(ManifestFormat::Binary),
            other => Err(EngineError::Config(format!(
                "unknown manifest format '{other}' (expected 'text' or 'binary')"
            ))),
        }
    }
}

/// A loaded manifest plus load diagnostics.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Entries in the order the file stored them.
    pub entries: Vec<ManifestEntry>,
    /// Malformed text lines dropped during parsing. Always 0 for the
    /// binary format, where malformed input is a hard failure.
    pub skipped_lines: usize,
}

/// Persist `entries` at `path` in the chosen format.
pub fn save(path: &Path, format: ManifestFormat, entries: &[ManifestEntry]) -> Result<()> {
    match format {
        ManifestFormat::Text => text::save(path, entries),
        ManifestFormat::Binary => binary::save(path, entries),
    }
}

/// Load a manifest, auto-detecting the format. Anything that does not
/// start with the binary magic is parsed as text.
pub fn load(path: &Path) -> Result<Manifest> {
    let data = std::fs::read(path)?;
    if data.starts_with(&binary::MAGIC) {
        binary::parse(path, &data)
    } else {
        text::parse(path, &data)
    }
}
