//! Parallel task execution.
//!
//! The task space is cut into batches that are fed to a dedicated rayon pool
//! through `par_bridge`, so batches start and finish in no particular order.
//! A batch builds all of its candidates locally and hands them to the sink in
//! a single merge. Failed tasks are counted and skipped; they never stop the
//! run.

use crate::error::{RunError, TaskError};
use crate::sink::{Candidate, CandidateSink};
use crate::stream::{seed_from_timestamp, SeedStream};
use crate::task::{GenerationTask, TaskBatch, TaskSpace};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_SAMPLES_PER_TASK: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// How characters are picked for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Each character is `stream value mod charset size`, one stream value
    /// per character. Reproducible.
    #[default]
    Stream,
    /// The stream advances once per candidate and its value is discarded;
    /// characters come from an independent thread-local RNG. Not
    /// reproducible between runs.
    Uniform,
}

/// Shared flag that stops new batches from being dispatched.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Generate the candidates of a single task, without duplicates, in the
/// order they were drawn.
pub fn generate_candidates(
    task: &GenerationTask,
    samples: usize,
    selection: SelectionMode,
) -> Result<Vec<String>, TaskError> {
    let chars = task.charset.chars();
    let seed = seed_from_timestamp(task.seed_timestamp)?;
    let mut stream = SeedStream::new(task.algorithm, seed);

    let mut passwords: Vec<String> = Vec::with_capacity(samples);
    for _ in 0..samples {
        let bytes: Vec<u8> = match selection {
            SelectionMode::Stream => (0..task.length)
                .map(|_| chars[stream.next_u32() as usize % chars.len()])
                .collect(),
            SelectionMode::Uniform => {
                let _ = stream.next_u32();
                let mut rng = rand::thread_rng();
                (0..task.length)
                    .filter_map(|_| chars.choose(&mut rng).copied())
                    .collect()
            }
        };
        // Every charset is ASCII.
        let password: String = bytes.into_iter().map(char::from).collect();
        if !passwords.contains(&password) {
            passwords.push(password);
        }
    }
    Ok(passwords)
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub total_tasks: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Tasks never started because the run was cancelled.
    pub skipped: u64,
    pub cancelled: bool,
    /// The first task failure observed, for diagnostics.
    pub first_error: Option<TaskError>,
}

struct BatchOutcome {
    candidates: Vec<Candidate>,
    succeeded: u64,
    failed: u64,
    first_error: Option<TaskError>,
}

/// Runs a task space on a fixed-size worker pool.
#[derive(Debug, Clone)]
pub struct Executor {
    threads: usize,
    batch_size: usize,
    samples_per_task: usize,
    selection: SelectionMode,
    cancel: CancelToken,
}

impl Executor {
    /// `threads == 0` selects the host's available parallelism.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: if threads == 0 { num_cpus::get() } else { threads },
            batch_size: DEFAULT_BATCH_SIZE,
            samples_per_task: DEFAULT_SAMPLES_PER_TASK,
            selection: SelectionMode::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_samples_per_task(mut self, samples: usize) -> Self {
        self.samples_per_task = samples;
        self
    }

    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute every task of `space`, merging candidates into `sink`.
    ///
    /// `on_progress` is called from worker threads with the number of tasks
    /// each finished batch covered.
    pub fn run<F>(
        &self,
        space: &TaskSpace,
        sink: &CandidateSink,
        on_progress: F,
    ) -> Result<RunReport, RunError>
    where
        F: Fn(u64) + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("seedoxide-worker-{}", i))
            .build()?;

        let total_tasks = space.len();
        info!(
            "Running {} tasks on {} worker threads ({} timestamps per batch)",
            total_tasks, self.threads, self.batch_size
        );

        let completed = AtomicU64::new(0);
        let succeeded = AtomicU64::new(0);
        let failed = AtomicU64::new(0);
        let first_error: Mutex<Option<TaskError>> = Mutex::new(None);

        pool.install(|| {
            space
                .batches(self.batch_size)
                .take_while(|_| !self.cancel.is_cancelled())
                .par_bridge()
                .for_each(|batch| {
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    let outcome = self.run_batch(&batch);
                    sink.merge(outcome.candidates);

                    succeeded.fetch_add(outcome.succeeded, Ordering::Relaxed);
                    failed.fetch_add(outcome.failed, Ordering::Relaxed);
                    if let Some(err) = outcome.first_error {
                        first_error
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .get_or_insert(err);
                    }
                    completed.fetch_add(batch.len(), Ordering::Relaxed);
                    on_progress(batch.len());
                });
        });

        let succeeded = succeeded.into_inner();
        let failed = failed.into_inner();
        let report = RunReport {
            total_tasks,
            succeeded,
            failed,
            skipped: total_tasks.saturating_sub(completed.into_inner()),
            cancelled: self.cancel.is_cancelled(),
            first_error: first_error.into_inner().unwrap_or_else(PoisonError::into_inner),
        };

        if report.failed > 0 {
            warn!(
                "{} of {} tasks failed (first error: {})",
                report.failed,
                report.total_tasks,
                report
                    .first_error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            );
        }
        if report.cancelled {
            warn!("Run cancelled, {} tasks were not executed", report.skipped);
        }
        Ok(report)
    }

    fn run_batch(&self, batch: &TaskBatch<'_>) -> BatchOutcome {
        let samples = self.samples_per_task as u64;
        let mut outcome = BatchOutcome {
            candidates: Vec::with_capacity(batch.len() as usize * self.samples_per_task),
            succeeded: 0,
            failed: 0,
            first_error: None,
        };

        for (ordinal, task) in batch.tasks() {
            match generate_candidates(&task, self.samples_per_task, self.selection) {
                Ok(passwords) => {
                    let base = ordinal.saturating_mul(samples);
                    outcome.candidates.extend(passwords.into_iter().enumerate().map(
                        |(i, password)| Candidate {
                            ordinal: base.saturating_add(i as u64),
                            password,
                        },
                    ));
                    outcome.succeeded += 1;
                }
                Err(err) => {
                    debug!(
                        "Task {} ({} seed {} length {}) failed: {}",
                        ordinal, task.algorithm, task.seed_timestamp, task.length, err
                    );
                    outcome.failed += 1;
                    outcome.first_error.get_or_insert(err);
                }
            }
        }
        outcome
    }
}
