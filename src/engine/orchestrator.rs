//! Run orchestration: scanning, hashing, finalization.
//!
//! State machine: `Idle → Scanning → Hashing → Finalizing →
//! {Done | Stopped | Error}`. The orchestrator builds the job list
//! (enumeration or manifest load), drives the scheduler, publishes
//! progress on a fixed interval, and classifies the finished run into a
//! summary. The `Error` terminal state is represented by returning
//! `Err`; no job list is published in that case because no hashing ran.

use crate::digest::DigestAlgorithm;
use crate::engine::hasher::ChunkedHasher;
use crate::engine::job::{Job, JobStatus};
use crate::engine::scheduler::Scheduler;
use crate::engine::{RunMode, RunState};
use crate::fs::walker::{enumerate_inputs, ScanOptions};
use crate::manifest::{self, ManifestEntry, ManifestFormat};
use crate::utils::errors::{EngineError, Result};
use crate::Config;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// How often progress is published while hashing, whether or not any file
/// finished in the interval.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(150);

/// Orchestrator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Scanning,
    Hashing,
    Finalizing,
    Done,
    Stopped,
}

/// Published to the observer; never carries references into the job list.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        total_files: usize,
        total_bytes: u64,
    },
    Tick {
        percent: u8,
        throughput_mbps: f64,
        processed_files: usize,
        processed_bytes: u64,
    },
    StateChanged(EngineState),
}

/// Terminal summary of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: EngineState,
    pub total_files: usize,
    pub corrupt: usize,
    pub missing: usize,
    /// Malformed manifest lines dropped during a verify load.
    pub skipped_lines: usize,
    /// Where the manifest was written (create mode, on success).
    pub manifest_path: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Everything a caller needs to present the run: the sorted job list and
/// the summary.
#[derive(Debug)]
pub struct RunOutcome {
    pub jobs: Vec<Job>,
    pub summary: RunSummary,
}

/// Engine tuning derived from [`Config`] plus CLI overrides.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// 0 means hardware concurrency.
    pub worker_threads: usize,
    pub window_size: u64,
    pub write_format: ManifestFormat,
    /// File stem of the implied manifest output (`<stem>.<ext>`).
    pub file_stem: String,
    pub scan: ScanOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            window_size: crate::engine::hasher::DEFAULT_WINDOW_SIZE,
            write_format: ManifestFormat::Text,
            file_stem: "Hash".to_string(),
            scan: ScanOptions::default(),
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            worker_threads: config.hashing.worker_threads,
            window_size: config.hashing.window_size,
            write_format: config.write_format()?,
            file_stem: config.manifest.file_stem.clone(),
            scan: ScanOptions {
                follow_links: config.scan.follow_links,
                exclude_patterns: config.scan.exclude_patterns.clone(),
            },
        })
    }
}

pub struct Orchestrator<'a> {
    algorithm: &'a dyn DigestAlgorithm,
    options: EngineOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(algorithm: &'a dyn DigestAlgorithm, options: EngineOptions) -> Self {
        Self { algorithm, options }
    }

    /// Create mode: enumerate `inputs`, hash everything, persist a manifest.
    ///
    /// A manifest write failure is reported but does not invalidate the
    /// completed hashing; the outcome then carries no `manifest_path`.
    pub fn create(
        &self,
        inputs: &[PathBuf],
        output: Option<&Path>,
        run: &RunState,
        events: &Sender<ProgressEvent>,
    ) -> Result<RunOutcome> {
        run.reset();
        let start = Instant::now();

        publish(events, ProgressEvent::StateChanged(EngineState::Scanning));
        let scan = enumerate_inputs(inputs, &self.options.scan)?;
        let jobs = scan.jobs;
        let manifest_path = output.map(Path::to_path_buf).unwrap_or_else(|| {
            scan.manifest_dir.join(format!(
                "{}.{}",
                self.options.file_stem,
                self.options.write_format.extension()
            ))
        });
        info!(
            files = jobs.len(),
            algorithm = self.algorithm.name(),
            "enumeration complete"
        );

        self.hash_all(&jobs, RunMode::Create, run, events, start)?;

        publish(events, ProgressEvent::StateChanged(EngineState::Finalizing));
        let stopped = run.stop_requested();
        let (jobs, corrupt, missing) = finalize(jobs);

        // No manifest is written for a cancelled run: it would record an
        // incomplete picture as if it were complete.
        let mut written = None;
        if !stopped {
            let entries: Vec<ManifestEntry> = jobs
                .iter()
                .filter(|job| job.status() == JobStatus::Done)
                .map(|job| ManifestEntry {
                    rel_path: job.rel_path.clone(),
                    size: job.size,
                    digest: job.result_digest(),
                })
                .collect();
            match manifest::save(&manifest_path, self.options.write_format, &entries) {
                Ok(()) => {
                    info!(path = %manifest_path.display(), entries = entries.len(), "manifest written");
                    written = Some(manifest_path);
                }
                Err(e) => error!("manifest write failed: {e}"),
            }
        }

        let state = if stopped {
            EngineState::Stopped
        } else {
            EngineState::Done
        };
        publish(events, ProgressEvent::StateChanged(state));

        let total_files = jobs.len();
        Ok(RunOutcome {
            jobs,
            summary: RunSummary {
                state,
                total_files,
                corrupt,
                missing,
                skipped_lines: 0,
                manifest_path: written,
                elapsed: start.elapsed(),
            },
        })
    }

    /// Verify mode: load the manifest at `manifest_path`, re-hash every
    /// entry, classify OK/corrupt/missing.
    pub fn verify(
        &self,
        manifest_path: &Path,
        run: &RunState,
        events: &Sender<ProgressEvent>,
    ) -> Result<RunOutcome> {
        run.reset();
        let start = Instant::now();

        publish(events, ProgressEvent::StateChanged(EngineState::Scanning));
        let loaded = manifest::load(manifest_path)?;
        if loaded.entries.is_empty() {
            return Err(EngineError::EmptyManifest(manifest_path.to_path_buf()));
        }
        if loaded.skipped_lines > 0 {
            warn!(
                skipped = loaded.skipped_lines,
                path = %manifest_path.display(),
                "malformed manifest lines were dropped"
            );
        }

        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let jobs: Vec<Job> = loaded
            .entries
            .into_iter()
            .map(|entry| {
                Job::with_expected(
                    base.join(&entry.rel_path),
                    entry.rel_path,
                    entry.size,
                    entry.digest,
                )
            })
            .collect();
        info!(files = jobs.len(), "manifest loaded");

        self.hash_all(&jobs, RunMode::Verify, run, events, start)?;

        publish(events, ProgressEvent::StateChanged(EngineState::Finalizing));
        let stopped = run.stop_requested();
        let (jobs, corrupt, missing) = finalize(jobs);

        let state = if stopped {
            EngineState::Stopped
        } else {
            EngineState::Done
        };
        publish(events, ProgressEvent::StateChanged(state));

        let total_files = jobs.len();
        Ok(RunOutcome {
            jobs,
            summary: RunSummary {
                state,
                total_files,
                corrupt,
                missing,
                skipped_lines: loaded.skipped_lines,
                manifest_path: None,
                elapsed: start.elapsed(),
            },
        })
    }

    /// Drive the scheduler on a background thread while publishing ticks on
    /// the fixed interval, so the observer never stalls even when no file
    /// finishes.
    fn hash_all(
        &self,
        jobs: &[Job],
        mode: RunMode,
        run: &RunState,
        events: &Sender<ProgressEvent>,
        start: Instant,
    ) -> Result<()> {
        publish(
            events,
            ProgressEvent::Started {
                total_files: jobs.len(),
                total_bytes: jobs.iter().map(|job| job.size).sum(),
            },
        );
        publish(events, ProgressEvent::StateChanged(EngineState::Hashing));

        let hasher = ChunkedHasher::with_window_size(self.algorithm, self.options.window_size);
        let scheduler = Scheduler::new(hasher, self.effective_workers());
        let total = jobs.len();

        let mut result = Ok(());
        std::thread::scope(|scope| {
            let handle = match std::thread::Builder::new()
                .name("hash-scheduler".to_string())
                .spawn_scoped(scope, || scheduler.run(jobs, mode, run))
            {
                Ok(handle) => handle,
                Err(e) => {
                    result = Err(EngineError::WorkerPool(format!(
                        "failed to spawn scheduler thread: {e}"
                    )));
                    return;
                }
            };

            // The scheduler thread can also die early (a panicking worker
            // unwinds through its scope), so watch the handle too or the
            // loop would wait on counters that will never advance.
            while run.processed_files() < total && !run.stop_requested() && !handle.is_finished()
            {
                std::thread::sleep(PROGRESS_INTERVAL);
                publish(events, tick(run, total, start));
            }

            result = match handle.join() {
                Ok(sched_result) => sched_result,
                Err(_) => Err(EngineError::WorkerPool(
                    "scheduler thread panicked".to_string(),
                )),
            };
        });

        // Final tick so the observer sees the landing totals.
        publish(events, tick(run, total, start));
        result
    }

    fn effective_workers(&self) -> usize {
        if self.options.worker_threads > 0 {
            self.options.worker_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

fn tick(run: &RunState, total: usize, start: Instant) -> ProgressEvent {
    let processed_files = run.processed_files();
    let processed_bytes = run.processed_bytes();
    let elapsed = start.elapsed().as_secs_f64();
    ProgressEvent::Tick {
        percent: (processed_files * 100 / total.max(1)).min(100) as u8,
        throughput_mbps: (processed_bytes as f64 / 1024.0 / 1024.0) / (elapsed + 0.01),
        processed_files,
        processed_bytes,
    }
}

/// Tally failures and stably sort the list for display: failures first,
/// successes next, unresolved jobs last, ties in enumeration order.
fn finalize(mut jobs: Vec<Job>) -> (Vec<Job>, usize, usize) {
    let corrupt = jobs
        .iter()
        .filter(|job| job.status() == JobStatus::Corrupt)
        .count();
    let missing = jobs
        .iter()
        .filter(|job| job.status() == JobStatus::Missing)
        .count();

    jobs.sort_by_key(|job| job.sort_priority());
    (jobs, corrupt, missing)
}

fn publish(events: &Sender<ProgressEvent>, event: ProgressEvent) {
    // A dropped receiver means nobody is watching; the run itself goes on.
    let _ = events.send(event);
}
