//! Text manifest format.
//!
//! UTF-8 with a leading byte-order mark. Lines starting with `;` are
//! comments. Each data line is exactly 16 lowercase hex digits, a space,
//! `*`, then the relative path. Malformed lines are skipped and counted
//! rather than aborting the load.

use super::{Manifest, ManifestEntry};
use crate::utils::errors::{EngineError, Result};
use chrono::Utc;
use std::path::Path;

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn save(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let mut out = String::with_capacity(96 + entries.len() * 48);
    out.push('\u{feff}');
    out.push_str("; ArcSFV Hash File v1.0\n");
    out.push_str(&format!("; Generated: {}\n;\n", Utc::now().to_rfc3339()));

    for entry in entries {
        out.push_str(&format!("{:016x} *{}\n", entry.digest, entry.rel_path));
    }

    std::fs::write(path, out.as_bytes()).map_err(|source| EngineError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse manifest text. `path` locates the manifest on disk; sizes are
/// recovered by re-reading each referenced file's length, 0 when the file
/// is gone (the text format does not store sizes).
pub fn parse(path: &Path, data: &[u8]) -> Result<Manifest> {
    let data = data.strip_prefix(BOM).unwrap_or(data);
    let text = String::from_utf8_lossy(data);
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut entries = Vec::new();
    let mut skipped_lines = 0;

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        // Fixed layout: digest in bytes 0..16, " *" separator at 16..18.
        // The separator bytes are ASCII, so the slices below stay on char
        // boundaries.
        let bytes = line.as_bytes();
        if bytes.len() < 18 || bytes[16] != b' ' || bytes[17] != b'*' {
            skipped_lines += 1;
            continue;
        }
        let Ok(digest) = u64::from_str_radix(&line[..16], 16) else {
            skipped_lines += 1;
            continue;
        };

        let rel_path = line[18..].to_string();
        let size = std::fs::metadata(base.join(&rel_path))
            .map(|meta| meta.len())
            .unwrap_or(0);

        entries.push(ManifestEntry {
            rel_path,
            size,
            digest,
        });
    }

    Ok(Manifest {
        entries,
        skipped_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_recovers_paths_and_digests() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("sub"))?;
        fs::write(temp_dir.path().join("a.bin"), b"12345")?;
        fs::write(temp_dir.path().join("sub/b.bin"), b"1234567")?;

        let entries = vec![
            ManifestEntry {
                rel_path: "a.bin".to_string(),
                size: 5,
                digest: 0xdead_beef_cafe_f00d,
            },
            ManifestEntry {
                rel_path: "sub/b.bin".to_string(),
                size: 7,
                digest: 1,
            },
        ];

        let path = temp_dir.path().join("Hash.arca");
        save(&path, &entries).unwrap();

        let manifest = parse(&path, &fs::read(&path)?).unwrap();
        assert_eq!(manifest.entries, entries);
        assert_eq!(manifest.skipped_lines, 0);
        Ok(())
    }

    #[test]
    fn test_written_file_starts_with_bom_and_header() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("Hash.arca");
        save(&path, &[]).unwrap();

        let data = fs::read(&path)?;
        assert!(data.starts_with(BOM));
        assert!(data[BOM.len()] == b';');
        Ok(())
    }

    #[test]
    fn test_empty_round_trip() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("Hash.arca");
        save(&path, &[]).unwrap();

        let manifest = parse(&path, &fs::read(&path)?).unwrap();
        assert!(manifest.entries.is_empty());
        assert_eq!(manifest.skipped_lines, 0);
        Ok(())
    }

    #[test]
    fn test_malformed_lines_are_skipped_and_counted() {
        let data = concat!(
            "; header\n",
            "0123456789abcdef *good.bin\n",
            "too short\n",
            "0123456789abcdef-*no-separator.bin\n",
            "zzzzzzzzzzzzzzzz *bad-hex.bin\n",
            "fedcba9876543210 *also-good.bin\r\n",
        );

        let manifest = parse(Path::new("/tmp/Hash.arca"), data.as_bytes()).unwrap();
        let paths: Vec<&str> = manifest
            .entries
            .iter()
            .map(|e| e.rel_path.as_str())
            .collect();
        assert_eq!(paths, vec!["good.bin", "also-good.bin"]);
        assert_eq!(manifest.skipped_lines, 3);
    }

    #[test]
    fn test_missing_bom_is_tolerated() {
        let data = "0000000000000001 *x.bin\n";
        let manifest = parse(Path::new("/tmp/Hash.arca"), data.as_bytes()).unwrap();
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.entries[0].digest, 1);
    }

    #[test]
    fn test_size_is_zero_for_missing_file() {
        let data = "00000000000000ab *no-such-file.bin\n";
        let manifest = parse(Path::new("/nonexistent/Hash.arca"), data.as_bytes()).unwrap();
        assert_eq!(manifest.entries[0].size, 0);
    }

    #[test]
    fn test_multibyte_garbage_line_is_skipped() {
        // Multibyte characters inside the digest field must not panic the
        // fixed-offset checks.
        let data = "déjà-vu corrupted line *x\n0000000000000002 *ok.bin\n";
        let manifest = parse(Path::new("/tmp/Hash.arca"), data.as_bytes()).unwrap();
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.skipped_lines, 1);
    }
}
