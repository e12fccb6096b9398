//! Binary manifest format.
//!
//! Layout: 4-byte magic, u32 version, u32 entry count, followed by `count`
//! entries of u32 path length, UTF-8 path bytes, u64 size, u64 digest. All
//! integers little-endian. No trailer. A declared count that exceeds the
//! remaining bytes is a hard parse failure, never a silent partial load.

use super::{Manifest, ManifestEntry};
use crate::utils::errors::{EngineError, Result};
use std::path::Path;

pub(super) const MAGIC: [u8; 4] = *b"ASFV";
const VERSION: u32 = 1;

pub fn save(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let count = field_u32(path, "entry count", entries.len())?;
    let mut out = Vec::with_capacity(12 + entries.len() * 48);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());

    for entry in entries {
        let path_bytes = entry.rel_path.as_bytes();
        let path_len = field_u32(path, "path length", path_bytes.len())?;
        out.extend_from_slice(&path_len.to_le_bytes());
        out.extend_from_slice(path_bytes);
        out.extend_from_slice(&entry.size.to_le_bytes());
        out.extend_from_slice(&entry.digest.to_le_bytes());
    }

    std::fs::write(path, &out).map_err(|source| EngineError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Length fields are fixed at u32 on the wire; a wider value cannot be
/// written faithfully and must fail instead of wrapping.
fn field_u32(path: &Path, field: &str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| EngineError::ManifestWrite {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{field} {value} exceeds the u32 wire field"),
        ),
    })
}

pub fn parse(path: &Path, data: &[u8]) -> Result<Manifest> {
    let mut reader = Reader { path, data, pos: 0 };

    if reader.take(4)? != MAGIC.as_slice() {
        return Err(reader.malformed("unrecognized magic tag"));
    }
    let version = reader.read_u32()?;
    if version != VERSION {
        return Err(reader.malformed(&format!("unsupported format version {version}")));
    }

    let count = reader.read_u32()? as usize;
    let mut entries = Vec::with_capacity(count.min(4096));

    for index in 0..count {
        let path_len = reader.read_u32()? as usize;
        let path_bytes = reader.take(path_len)?;
        let rel_path = std::str::from_utf8(path_bytes)
            .map_err(|_| reader.malformed(&format!("entry {index}: path is not valid UTF-8")))?
            .to_string();
        let size = reader.read_u64()?;
        let digest = reader.read_u64()?;
        entries.push(ManifestEntry {
            rel_path,
            size,
            digest,
        });
    }

    Ok(Manifest {
        entries,
        skipped_lines: 0,
    })
}

struct Reader<'a> {
    path: &'a Path,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.malformed("truncated manifest"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn malformed(&self, reason: &str) -> EngineError {
        EngineError::ManifestParse {
            path: self.path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_entries() -> Vec<ManifestEntry> {
        vec![
            ManifestEntry {
                rel_path: "z-last-alphabetically.bin".to_string(),
                size: u64::MAX,
                digest: 0xffff_ffff_ffff_ffff,
            },
            ManifestEntry {
                rel_path: "a/deep/nested/path.dat".to_string(),
                size: 0,
                digest: 0,
            },
            ManifestEntry {
                rel_path: "accenté-名前.bin".to_string(),
                size: 12,
                digest: 42,
            },
        ]
    }

    #[test]
    fn test_round_trip_preserves_order_and_values() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("Hash.arcb");
        save(&path, &sample_entries()).unwrap();

        let manifest = parse(&path, &fs::read(&path)?).unwrap();
        assert_eq!(manifest.entries, sample_entries());
        Ok(())
    }

    #[test]
    fn test_empty_round_trip() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("Hash.arcb");
        save(&path, &[]).unwrap();

        let manifest = parse(&path, &fs::read(&path)?).unwrap();
        assert!(manifest.entries.is_empty());
        Ok(())
    }

    #[test]
    fn test_bad_magic_is_hard_failure() {
        let mut data = Vec::new();
        data.extend_from_slice(b"NOPE");
        data.extend_from_slice(&VERSION.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        let err = parse(Path::new("/tmp/Hash.arcb"), &data).unwrap_err();
        assert!(matches!(err, EngineError::ManifestParse { .. }));
    }

    #[test]
    fn test_unsupported_version_is_hard_failure() {
        let mut data = Vec::new();
        data.extend_from_slice(&MAGIC);
        data.extend_from_slice(&99u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        let err = parse(Path::new("/tmp/Hash.arcb"), &data).unwrap_err();
        assert!(matches!(err, EngineError::ManifestParse { .. }));
    }

    #[test]
    fn test_count_exceeding_remaining_bytes_is_hard_failure() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("Hash.arcb");
        save(&path, &sample_entries()).unwrap();

        let mut data = fs::read(&path)?;
        // Inflate the declared count past the actual entries.
        data[8..12].copy_from_slice(&100u32.to_le_bytes());

        let err = parse(&path, &data).unwrap_err();
        assert!(matches!(err, EngineError::ManifestParse { .. }));
        Ok(())
    }

    #[test]
    fn test_truncated_entry_is_hard_failure() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("Hash.arcb");
        save(&path, &sample_entries()).unwrap();

        let data = fs::read(&path)?;
        let err = parse(&path, &data[..data.len() - 3]).unwrap_err();
        assert!(matches!(err, EngineError::ManifestParse { .. }));
        Ok(())
    }

    #[test]
    fn test_length_wider_than_wire_field_is_write_error() {
        let path = Path::new("/tmp/Hash.arcb");
        assert_eq!(field_u32(path, "entry count", 3).unwrap(), 3);

        let err = field_u32(path, "path length", u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, EngineError::ManifestWrite { .. }));
    }

    #[test]
    fn test_invalid_utf8_path_is_hard_failure() {
        let mut data = Vec::new();
        data.extend_from_slice(&MAGIC);
        data.extend_from_slice(&VERSION.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0xFF, 0xFE]);
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());

        let err = parse(Path::new("/tmp/Hash.arcb"), &data).unwrap_err();
        assert!(matches!(err, EngineError::ManifestParse { .. }));
    }
}
