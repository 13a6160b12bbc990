//! Bounded-concurrency execution of independent jobs with per-job retry.
//!
//! All jobs are driven as futures within the calling task. A [`Throttler`] caps how
//! many attempts are in flight; a job releases its slot between attempts so that a
//! retry queues behind jobs that are already waiting. A job that exhausts its
//! attempts is recorded as failed without disturbing its siblings.

use super::job_tracker::JobTracker;
use super::throttler::Throttler;
use crate::Result;
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

const LOG_TARGET: &str = "      jobs";

/// Jobs in flight at once unless configured otherwise.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Total attempts per job unless configured otherwise.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Largest retry budget accepted from configuration or the command line.
pub const MAX_RETRY_BUDGET: u32 = 5;

/// How a job ended.
#[derive(Debug, Clone)]
pub enum JobOutcome<T> {
    Succeeded(T),
    Failed { attempts: u32, error: Arc<ohno::AppError> },
}

impl<T> JobOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    throttler: Throttler,
    retry_budget: u32,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY, DEFAULT_RETRY_BUDGET)
    }
}

impl Orchestrator {
    /// `max_concurrency` of zero means unbounded; a `retry_budget` of zero still runs each job once.
    #[must_use]
    pub fn new(max_concurrency: usize, retry_budget: u32) -> Self {
        Self {
            throttler: Throttler::new(max_concurrency),
            retry_budget,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        if self.retry_budget == 0 { 1 } else { self.retry_budget }
    }

    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.throttler.max_concurrent()
    }

    /// Run `body` once per job and collect every outcome by job name.
    ///
    /// Each attempt gets a fresh clone of the job's input. The call returns only after
    /// every job has either succeeded or exhausted its attempts.
    pub async fn run<I, T, F, Fut>(
        &self,
        jobs: impl IntoIterator<Item = (String, I)>,
        tracker: &JobTracker,
        body: F,
    ) -> BTreeMap<String, JobOutcome<T>>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let jobs: Vec<_> = jobs.into_iter().collect();
        tracker.add_jobs(jobs.len() as u64);
        log::info!(
            target: LOG_TARGET,
            "Running {} jobs, at most {} at a time, {} attempts each",
            jobs.len(),
            self.max_concurrency(),
            self.max_attempts()
        );

        let body = &body;
        let runs = jobs.into_iter().map(|(name, input)| async move {
            let outcome = self.run_job(&name, input, tracker, body).await;
            (name, outcome)
        });

        join_all(runs).await.into_iter().collect()
    }

    async fn run_job<I, T, F, Fut>(&self, name: &str, input: I, tracker: &JobTracker, body: &F) -> JobOutcome<T>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            let result = {
                let _permit = self.throttler.acquire().await;
                body(input.clone()).await
            };

            match result {
                Ok(value) => {
                    log::debug!(target: LOG_TARGET, "Job '{name}' succeeded on attempt {attempt}");
                    tracker.job_succeeded();
                    return JobOutcome::Succeeded(value);
                }

                Err(e) if attempt < max_attempts => {
                    log::debug!(target: LOG_TARGET, "Job '{name}' failed on attempt {attempt}/{max_attempts}, retrying: {e:#}");
                    tracker.job_retried();
                    attempt += 1;
                }

                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Job '{name}' failed after {attempt} attempt(s): {e:#}");
                    tracker.job_failed();
                    return JobOutcome::Failed {
                        attempts: attempt,
                        error: Arc::new(e),
                    };
                }
            }
        }
    }
}
