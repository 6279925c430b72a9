//! Bounded worker pool: N concurrent jobs, one task per job, failures collected.
//!
//! Concurrency is capped by a [`Semaphore`]; tasks live in a [`JoinSet`].
//! Each job body runs in its own spawned task so a panic is reported as a
//! failed result instead of tearing down the pool.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use snd_core::{Error, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Anything the pool can run.
pub trait PoolJob: Send + 'static {
    /// Human-readable label used in progress lines and the summary.
    fn label(&self) -> String;
}

/// The result of one job.
#[derive(Debug)]
pub struct JobResult<T> {
    /// 1-based position in the submitted job list.
    pub id: usize,
    pub label: String,
    pub outcome: Result<T>,
    pub elapsed: Duration,
}

impl<T> JobResult<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Shared completion counters.
#[derive(Debug)]
pub struct Progress {
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Count one finished job and log a `[done/total]` line.
    pub fn record(&self, label: &str, error: Option<&Error>, elapsed: Duration) {
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        match error {
            None => tracing::info!(
                "[{done}/{}] {label} ({:.1}s)",
                self.total,
                elapsed.as_secs_f64()
            ),
            Some(e) => {
                self.failed.fetch_add(1, Ordering::AcqRel);
                tracing::warn!("[{done}/{}] FAILED {label}: {e}", self.total);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Acquire)
    }
}

/// Runs jobs with at most `workers` in flight.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// `workers` is clamped to at least one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` over every job and return one result per job, in the order
    /// the jobs were given.
    pub async fn run<J, T, F, Fut>(&self, jobs: Vec<J>, f: F) -> Vec<JobResult<T>>
    where
        J: PoolJob,
        T: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let progress = Arc::new(Progress::new(total));
        let f = Arc::new(f);
        let mut set = JoinSet::new();
        let mut labels = Vec::with_capacity(total);

        tracing::debug!("dispatching {total} jobs on {} workers", self.workers);

        for (index, job) in jobs.into_iter().enumerate() {
            let label = job.label();
            labels.push(label.clone());
            let semaphore = Arc::clone(&semaphore);
            let progress = Arc::clone(&progress);
            let f = Arc::clone(&f);

            set.spawn(async move {
                let start = Instant::now();
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => match tokio::spawn(f(job)).await {
                        Ok(outcome) => outcome,
                        Err(e) if e.is_panic() => {
                            Err(Error::Internal(format!("job panicked: {e}")))
                        }
                        Err(e) => Err(Error::Internal(format!("job was cancelled: {e}"))),
                    },
                    Err(e) => Err(Error::Internal(format!("worker pool closed: {e}"))),
                };
                let elapsed = start.elapsed();
                progress.record(&label, outcome.as_ref().err(), elapsed);
                (index, outcome, elapsed)
            });
        }

        let mut slots: Vec<Option<(Result<T>, Duration)>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome, elapsed)) => slots[index] = Some((outcome, elapsed)),
                Err(e) => tracing::error!("worker task failed: {e}"),
            }
        }

        slots
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(index, (slot, label))| {
                let (outcome, elapsed) = slot.unwrap_or_else(|| {
                    (
                        Err(Error::Internal("job did not report a result".to_string())),
                        Duration::ZERO,
                    )
                });
                JobResult {
                    id: index + 1,
                    label,
                    outcome,
                    elapsed,
                }
            })
            .collect()
    }
}
