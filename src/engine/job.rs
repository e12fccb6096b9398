//! Job model: one file's hashing task plus its lifecycle state.
//!
//! Path, size and expected digest are immutable after creation. Status and
//! the computed digest are written by exactly one worker and read
//! concurrently by the progress observer, so both live in atomic cells
//! and an observer never sees a torn update.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of a job. Transitions are strictly forward:
/// `Queued → Hashing → {Done, Ok, Corrupt, Missing, ErrorAccess}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobStatus {
    /// Not yet claimed by a worker.
    Queued = 0,
    /// Claimed; digest computation in progress (or abandoned by
    /// cancellation, in which case the run ends as `Stopped`).
    Hashing = 1,
    /// Create mode: digest computed and recorded.
    Done = 2,
    /// Verify mode: computed digest matches the manifest.
    Ok = 3,
    /// Verify mode: computed digest differs from the manifest.
    Corrupt = 4,
    /// Verify mode: the file no longer exists on disk.
    Missing = 5,
    /// The file exists but could not be opened, sized or mapped, or in
    /// create mode vanished before hashing started.
    ErrorAccess = 6,
}

impl JobStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => JobStatus::Queued,
            1 => JobStatus::Hashing,
            2 => JobStatus::Done,
            3 => JobStatus::Ok,
            4 => JobStatus::Corrupt,
            5 => JobStatus::Missing,
            _ => JobStatus::ErrorAccess,
        }
    }

    /// A terminal status is never left again within a run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Queued | JobStatus::Hashing)
    }

    /// Display ordering hint: failures first, successes next, jobs the run
    /// never resolved last. Purely presentational.
    pub fn sort_priority(self) -> u8 {
        match self {
            JobStatus::Corrupt | JobStatus::Missing | JobStatus::ErrorAccess => 0,
            JobStatus::Done | JobStatus::Ok => 2,
            JobStatus::Queued | JobStatus::Hashing => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Hashing => "Hashing",
            JobStatus::Done => "Done",
            JobStatus::Ok => "OK",
            JobStatus::Corrupt => "CORRUPT",
            JobStatus::Missing => "MISSING",
            JobStatus::ErrorAccess => "ERROR ACCESS",
        }
    }
}

/// One file under consideration.
#[derive(Debug)]
pub struct Job {
    /// Absolute location on disk.
    pub full_path: PathBuf,
    /// Manifest key: path relative to the scan root, `/`-separated.
    /// Unique within a run.
    pub rel_path: String,
    /// Byte length at enumeration time (verify mode: the size recorded in
    /// the manifest, display only).
    pub size: u64,
    /// Digest loaded from the manifest in verify mode; 0 otherwise.
    pub expected_digest: u64,

    status: AtomicU8,
    result_digest: AtomicU64,
}

impl Job {
    pub fn new(full_path: PathBuf, rel_path: String, size: u64) -> Self {
        Self::with_expected(full_path, rel_path, size, 0)
    }

    pub fn with_expected(
        full_path: PathBuf,
        rel_path: String,
        size: u64,
        expected_digest: u64,
    ) -> Self {
        Self {
            full_path,
            rel_path,
            size,
            expected_digest,
            status: AtomicU8::new(JobStatus::Queued as u8),
            result_digest: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Publish a new status. Called only by the worker that claimed this
    /// job; concurrent readers observe either the old or the new value.
    pub fn set_status(&self, status: JobStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Digest computed this run; 0 until computed.
    pub fn result_digest(&self) -> u64 {
        self.result_digest.load(Ordering::Acquire)
    }

    pub fn set_result_digest(&self, digest: u64) {
        self.result_digest.store(digest, Ordering::Release);
    }

    pub fn sort_priority(&self) -> u8 {
        self.status().sort_priority()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_new_job_is_queued() {
        let job = Job::new(PathBuf::from("/data/a.bin"), "a.bin".to_string(), 42);
        assert_eq!(job.status(), JobStatus::Queued);
        assert_eq!(job.result_digest(), 0);
        assert_eq!(job.expected_digest, 0);
        assert!(!job.status().is_terminal());
    }

    #[test]
    fn test_status_round_trips_through_cell() {
        let job = Job::new(PathBuf::from("/data/a.bin"), "a.bin".to_string(), 0);
        for status in [
            JobStatus::Hashing,
            JobStatus::Done,
            JobStatus::Ok,
            JobStatus::Corrupt,
            JobStatus::Missing,
            JobStatus::ErrorAccess,
        ] {
            job.set_status(status);
            assert_eq!(job.status(), status);
        }
    }

    #[test]
    fn test_sort_priority_ordering() {
        assert_eq!(JobStatus::Corrupt.sort_priority(), 0);
        assert_eq!(JobStatus::Missing.sort_priority(), 0);
        assert_eq!(JobStatus::ErrorAccess.sort_priority(), 0);
        assert_eq!(JobStatus::Ok.sort_priority(), 2);
        assert_eq!(JobStatus::Done.sort_priority(), 2);
        assert_eq!(JobStatus::Queued.sort_priority(), 3);
        assert_eq!(JobStatus::Hashing.sort_priority(), 3);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Ok.is_terminal());
        assert!(JobStatus::Corrupt.is_terminal());
        assert!(JobStatus::Missing.is_terminal());
        assert!(JobStatus::ErrorAccess.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Hashing.is_terminal());
    }
}
