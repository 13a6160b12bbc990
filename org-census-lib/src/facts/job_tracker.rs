//! Job accounting for progress reporting.

use super::progress::Progress;
use core::sync::atomic::{AtomicU64, Ordering};
use owo_colors::OwoColorize;
use std::sync::Arc;

#[derive(Debug, Default)]
struct JobCounters {
    issued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

/// Counts orchestrated jobs by state and feeds the totals to a progress indicator.
#[derive(Debug, Clone)]
pub struct JobTracker {
    counters: Arc<JobCounters>,
}

impl JobTracker {
    #[must_use]
    pub fn new(progress: &Arc<dyn Progress>) -> Self {
        let counters: Arc<JobCounters> = Arc::default();

        let counters_clone = Arc::clone(&counters);
        let use_colors = progress.use_colors();
        progress.set_determinate(Box::new(move || Self::progress_reporter_callback(&counters_clone, use_colors)));

        Self { counters }
    }

    pub fn add_jobs(&self, count: u64) {
        let _ = self.counters.issued.fetch_add(count, Ordering::Relaxed);
    }

    pub fn job_succeeded(&self) {
        let _ = self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_failed(&self) {
        let _ = self.counters.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_retried(&self) {
        let _ = self.counters.retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns (issued, succeeded, failed, retried).
    #[must_use]
    pub fn snapshot(&self) -> (u64, u64, u64, u64) {
        (
            self.counters.issued.load(Ordering::Relaxed),
            self.counters.succeeded.load(Ordering::Relaxed),
            self.counters.failed.load(Ordering::Relaxed),
            self.counters.retried.load(Ordering::Relaxed),
        )
    }

    /// Returns (`total_length`, `current_position`, `message_string`).
    fn progress_reporter_callback(counters: &JobCounters, use_colors: bool) -> (u64, u64, String) {
        let issued = counters.issued.load(Ordering::Relaxed);
        let succeeded = counters.succeeded.load(Ordering::Relaxed);
        let failed = counters.failed.load(Ordering::Relaxed);
        let retried = counters.retried.load(Ordering::Relaxed);

        if issued == 0 {
            return (0, 0, "No jobs".to_string());
        }

        let done = succeeded + failed;
        let mut parts = vec![format!("{done}/{issued} repos")];

        if retried > 0 {
            let text = format!("{retried} retried");
            parts.push(if use_colors { format!("{}", text.yellow()) } else { text });
        }

        if failed > 0 {
            let text = format!("{failed} failed");
            parts.push(if use_colors { format!("{}", text.red()) } else { text });
        }

        (issued, done, parts.join(", "))
    }
}
