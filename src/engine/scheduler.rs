//! Lock-free work distribution across a fixed worker pool.
//!
//! A single shared cursor is claimed with an atomic fetch-and-increment, so
//! every job is processed at most once and no two workers ever touch the
//! same job. Claim order is total; completion order is not.

use crate::engine::hasher::{ChunkedHasher, HashOutcome};
use crate::engine::job::{Job, JobStatus};
use crate::engine::{RunMode, RunState};
use crate::utils::errors::{EngineError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub struct Scheduler<'a> {
    hasher: ChunkedHasher<'a>,
    workers: usize,
}

impl<'a> Scheduler<'a> {
    pub fn new(hasher: ChunkedHasher<'a>, workers: usize) -> Self {
        Self {
            hasher,
            workers: workers.max(1),
        }
    }

    /// Run every job to a terminal status, or until cancellation is
    /// observed. Blocks until all workers have exited (join barrier).
    pub fn run(&self, jobs: &[Job], mode: RunMode, run: &RunState) -> Result<()> {
        let cursor = AtomicUsize::new(0);
        let mut spawn_error = None;

        std::thread::scope(|scope| {
            for i in 0..self.workers {
                let spawned = std::thread::Builder::new()
                    .name(format!("hash-worker-{i}"))
                    .spawn_scoped(scope, || self.worker_loop(jobs, mode, run, &cursor));
                if let Err(e) = spawned {
                    // Workers already launched drain the list; stop them
                    // so the failure surfaces promptly.
                    run.request_stop();
                    spawn_error = Some(e);
                    break;
                }
            }
        });

        match spawn_error {
            Some(e) => Err(EngineError::WorkerPool(format!(
                "failed to spawn worker thread: {e}"
            ))),
            None => Ok(()),
        }
    }

    fn worker_loop(&self, jobs: &[Job], mode: RunMode, run: &RunState, cursor: &AtomicUsize) {
        while !run.stop_requested() {
            let idx = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(job) = jobs.get(idx) else { break };
            self.process(job, mode, run);
        }
    }

    /// Hash one claimed job and classify the outcome.
    fn process(&self, job: &Job, mode: RunMode, run: &RunState) {
        job.set_status(JobStatus::Hashing);

        // Missing files are detected before hashing so they classify apart
        // from open failures.
        if !job.full_path.exists() {
            let status = match mode {
                RunMode::Verify => JobStatus::Missing,
                RunMode::Create => JobStatus::ErrorAccess,
            };
            job.set_status(status);
            run.file_done();
            return;
        }

        match self.hasher.hash_file(&job.full_path, run) {
            HashOutcome::Complete(digest) => {
                job.set_result_digest(digest);
                let status = match mode {
                    RunMode::Create => JobStatus::Done,
                    RunMode::Verify if digest == job.expected_digest => JobStatus::Ok,
                    RunMode::Verify => JobStatus::Corrupt,
                };
                job.set_status(status);
                run.file_done();
            }
            HashOutcome::Unavailable(reason) => {
                warn!(path = %job.full_path.display(), %reason, "file unavailable for hashing");
                job.set_status(JobStatus::ErrorAccess);
                run.file_done();
            }
            HashOutcome::Cancelled => {
                // Status stays Hashing: after a Stopped run a non-terminal
                // status means "not verified this run", not an error.
                debug!(path = %job.full_path.display(), "hash cancelled mid-file");
            }
        }
    }
}
