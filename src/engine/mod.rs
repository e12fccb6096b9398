//! Parallel hashing engine.
//!
//! The engine takes a job list (built by enumeration or loaded from a
//! manifest), fans it out across a fixed pool of hashing workers, and
//! aggregates per-file results into a run summary. All cross-thread state
//! lives in [`RunState`] and in the atomic cells of each [`job::Job`].

pub mod hasher;
pub mod job;
pub mod orchestrator;
pub mod scheduler;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// What a run does with the digests it computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Hash every enumerated file and record the digests in a new manifest.
    Create,
    /// Re-hash every manifest entry and compare against the recorded digest.
    Verify,
}

/// Shared counters for one run.
///
/// Constructed per run rather than held in process globals so the engine
/// stays reentrant; workers write, the progress loop and any observer read.
#[derive(Debug, Default)]
pub struct RunState {
    /// Running total of file bytes consumed across all workers.
    processed_bytes: AtomicU64,
    /// Count of jobs that reached a terminal status.
    processed_files: AtomicUsize,
    /// Cooperative cancellation flag.
    stop_requested: AtomicBool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all counters at the start of a run. The stop flag is cleared
    /// too, so a state reused after cancellation starts fresh.
    pub fn reset(&self) {
        self.processed_bytes.store(0, Ordering::Relaxed);
        self.processed_files.store(0, Ordering::Relaxed);
        self.stop_requested.store(false, Ordering::Relaxed);
    }

    /// Ask workers to stop. Advisory: in-flight window hashing finishes the
    /// current window before the flag is observed.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    pub fn add_bytes(&self, n: u64) {
        self.processed_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes.load(Ordering::Relaxed)
    }

    /// Record one job reaching a terminal status.
    pub fn file_done(&self) {
        self.processed_files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_files(&self) -> usize {
        self.processed_files.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_counters_and_stop_flag() {
        let state = RunState::new();
        state.add_bytes(1024);
        state.file_done();
        state.request_stop();

        state.reset();

        assert_eq!(state.processed_bytes(), 0);
        assert_eq!(state.processed_files(), 0);
        assert!(!state.stop_requested());
    }
}
