//! Chunked memory-mapped file hasher.
//!
//! Streams a file through the digest in fixed-size mapped windows instead
//! of buffered reads, keeping peak memory bounded regardless of file size.
//! Each window's byte count is added to the shared `processed_bytes`
//! counter as it is consumed; that counter is the only channel through
//! which global throughput is observed.

use crate::digest::DigestAlgorithm;
use crate::engine::RunState;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;

/// Default streaming window: 32 MiB.
pub const DEFAULT_WINDOW_SIZE: u64 = 32 * 1024 * 1024;

/// Mapping offsets must be aligned to the platform allocation granularity.
/// 64 KiB is the Windows granularity and a multiple of every common page
/// size, so rounding window starts down to it is valid on all targets.
const MAP_ALIGNMENT: u64 = 64 * 1024;

/// Digest seed for every run. Manifests are only comparable across runs
/// because the seed never changes.
const DIGEST_SEED: u64 = 0;

/// Result of hashing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashOutcome {
    /// Every byte was consumed; the digest is valid. Zero-length files
    /// complete with digest 0 by definition.
    Complete(u64),
    /// The file could not be opened, sized or mapped. The partial digest,
    /// if any, is discarded.
    Unavailable(String),
    /// Cancellation was observed between windows. The digest was never
    /// finalized and must not be treated as a result.
    Cancelled,
}

pub struct ChunkedHasher<'a> {
    algorithm: &'a dyn DigestAlgorithm,
    window_size: u64,
}

impl<'a> ChunkedHasher<'a> {
    pub fn new(algorithm: &'a dyn DigestAlgorithm) -> Self {
        Self::with_window_size(algorithm, DEFAULT_WINDOW_SIZE)
    }

    /// The window size is rounded up to a whole number of alignment
    /// granules so window starts stay mappable offsets.
    pub fn with_window_size(algorithm: &'a dyn DigestAlgorithm, window_size: u64) -> Self {
        let granules = window_size.max(1).div_ceil(MAP_ALIGNMENT);
        Self {
            algorithm,
            window_size: granules * MAP_ALIGNMENT,
        }
    }

    /// Hash the file at `path`, window by window, checking the stop flag
    /// between windows.
    pub fn hash_file(&self, path: &Path, run: &RunState) -> HashOutcome {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return HashOutcome::Unavailable(format!("open failed: {e}")),
        };
        let len = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => return HashOutcome::Unavailable(format!("stat failed: {e}")),
        };
        if len == 0 {
            return HashOutcome::Complete(0);
        }

        let mut digest = self.algorithm.init(DIGEST_SEED);
        let mut offset: u64 = 0;
        let mut remaining = len;

        while remaining > 0 {
            if run.stop_requested() {
                return HashOutcome::Cancelled;
            }

            let aligned = offset / MAP_ALIGNMENT * MAP_ALIGNMENT;
            let padding = (offset - aligned) as usize;
            let want = self.window_size.min(remaining + padding as u64) as usize;

            let window = match unsafe { MmapOptions::new().offset(aligned).len(want).map(&file) }
            {
                Ok(map) => map,
                Err(e) => {
                    return HashOutcome::Unavailable(format!(
                        "map window at offset {aligned} failed: {e}"
                    ))
                }
            };
            advise_sequential(&window);

            let take = ((want - padding) as u64).min(remaining) as usize;
            digest.update(&window[padding..padding + take]);
            run.add_bytes(take as u64);

            offset += take as u64;
            remaining -= take as u64;
            // window dropped here, releasing the mapping
        }

        HashOutcome::Complete(digest.finalize())
    }
}

#[cfg(unix)]
fn advise_sequential(map: &Mmap) {
    let _ = map.advise(memmap2::Advice::Sequential);
}

#[cfg(not(unix))]
fn advise_sequential(_map: &Mmap) {}
