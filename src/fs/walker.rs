//! Input enumeration: turns files and directories into a job list.
//!
//! Directory inputs are walked recursively for regular files. Relative
//! paths are computed against the *parent* of each input directory, so the
//! directory's own name is kept as the leading path segment and survives
//! into the manifest. Unreadable entries are logged and skipped; they never
//! abort enumeration.

use crate::engine::job::Job;
use crate::utils::errors::{EngineError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Options for input enumeration.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Follow symbolic links while walking directories.
    pub follow_links: bool,

    /// Name fragments to exclude. Empty by default: an integrity tool
    /// should not silently drop files unless asked to.
    pub exclude_patterns: Vec<String>,
}

/// Result of enumerating the create-mode inputs.
#[derive(Debug)]
pub struct ScanResult {
    pub jobs: Vec<Job>,
    /// Directory the manifest lands in: the parent of the first input,
    /// so that every key resolves against the manifest's own directory
    /// on a later load.
    pub manifest_dir: PathBuf,
}

pub fn enumerate_inputs(inputs: &[PathBuf], options: &ScanOptions) -> Result<ScanResult> {
    if inputs.is_empty() {
        return Err(EngineError::Config("no input paths given".to_string()));
    }

    let mut jobs = Vec::new();
    let mut seen = HashSet::new();
    let mut manifest_dir: Option<PathBuf> = None;

    for input in inputs {
        if input.is_dir() {
            // Relative to the parent so "<dirname>/..." is the manifest key.
            let base = input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| input.clone());

            for entry in WalkDir::new(input).follow_links(options.follow_links) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                if should_exclude(&entry, &options.exclude_patterns) {
                    continue;
                }
                if !entry.file_type().is_file() {
                    continue;
                }
                let size = match entry.metadata() {
                    Ok(meta) => meta.len(),
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "skipping unreadable file");
                        continue;
                    }
                };
                push_job(
                    &mut jobs,
                    &mut seen,
                    entry.path().to_path_buf(),
                    rel_key(entry.path(), &base),
                    size,
                );
            }
            if manifest_dir.is_none() {
                manifest_dir = Some(base);
            }
        } else if input.is_file() {
            let size = std::fs::metadata(input)?.len();
            let rel = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| input.to_string_lossy().into_owned());
            push_job(&mut jobs, &mut seen, input.clone(), rel, size);
            if manifest_dir.is_none() {
                manifest_dir = Some(
                    input
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from(".")),
                );
            }
        } else {
            warn!(path = %input.display(), "input does not exist, skipping");
        }
    }

    let manifest_dir = manifest_dir
        .ok_or_else(|| EngineError::Config("none of the input paths exist".to_string()))?;

    Ok(ScanResult { jobs, manifest_dir })
}

/// Manifest key for `path`: relative to `base`, `/`-separated so manifests
/// are portable across platforms.
fn rel_key(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

fn push_job(
    jobs: &mut Vec<Job>,
    seen: &mut HashSet<String>,
    full_path: PathBuf,
    rel_path: String,
    size: u64,
) {
    // The manifest cannot represent duplicate keys; keep the first.
    if !seen.insert(rel_path.clone()) {
        warn!(rel_path = %rel_path, "duplicate relative path, keeping first occurrence");
        return;
    }
    jobs.push(Job::new(full_path, rel_path, size));
}

fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| file_name.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_directory_input_keeps_dir_name_in_rel_path() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("photos");
        fs::create_dir_all(root.join("trip"))?;
        fs::write(root.join("a.raw"), b"aaaa")?;
        fs::write(root.join("trip/b.raw"), b"bb")?;

        let scan = enumerate_inputs(&[root.clone()], &ScanOptions::default()).unwrap();

        let mut rels: Vec<&str> = scan.jobs.iter().map(|j| j.rel_path.as_str()).collect();
        rels.sort();
        assert_eq!(rels, vec!["photos/a.raw", "photos/trip/b.raw"]);
        assert_eq!(scan.manifest_dir, temp_dir.path());
        Ok(())
    }

    #[test]
    fn test_plain_file_input_uses_filename() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("lonely.bin");
        fs::write(&file, b"123")?;

        let scan = enumerate_inputs(&[file], &ScanOptions::default()).unwrap();

        assert_eq!(scan.jobs.len(), 1);
        assert_eq!(scan.jobs[0].rel_path, "lonely.bin");
        assert_eq!(scan.jobs[0].size, 3);
        assert_eq!(scan.manifest_dir, temp_dir.path());
        Ok(())
    }

    #[test]
    fn test_first_directory_wins_manifest_location() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("elsewhere").join("second");
        fs::create_dir(&first)?;
        fs::create_dir_all(&second)?;
        fs::write(first.join("a.bin"), b"a")?;
        fs::write(second.join("b.bin"), b"b")?;

        let scan =
            enumerate_inputs(&[first.clone(), second], &ScanOptions::default()).unwrap();
        assert_eq!(scan.manifest_dir, temp_dir.path());
        assert_eq!(scan.jobs.len(), 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_rel_paths_keep_first() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("same.bin");
        fs::write(&file, b"x")?;

        let scan =
            enumerate_inputs(&[file.clone(), file], &ScanOptions::default()).unwrap();
        assert_eq!(scan.jobs.len(), 1);
        Ok(())
    }

    #[test]
    fn test_exclude_patterns() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("data");
        fs::create_dir(&root)?;
        fs::write(root.join("keep.bin"), b"k")?;
        fs::write(root.join("skip.tmp"), b"s")?;

        let options = ScanOptions {
            follow_links: false,
            exclude_patterns: vec![".tmp".to_string()],
        };
        let scan = enumerate_inputs(&[root], &options).unwrap();

        assert_eq!(scan.jobs.len(), 1);
        assert_eq!(scan.jobs[0].rel_path, "data/keep.bin");
        Ok(())
    }

    #[test]
    fn test_no_inputs_is_config_error() {
        let err = enumerate_inputs(&[], &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_nonexistent_inputs_only_is_config_error() {
        let err = enumerate_inputs(
            &[PathBuf::from("/nonexistent/nowhere")],
            &ScanOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
