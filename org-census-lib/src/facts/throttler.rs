use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Limits how many units of work run at once.
///
/// Call [`Throttler::acquire`] before each unit of work and hold the permit until the
/// work settles. A ceiling of zero means no limit.
#[derive(Debug, Clone)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Throttler {
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let permits = if max_concurrent == 0 {
            Semaphore::MAX_PERMITS
        } else {
            max_concurrent
        };

        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            max_concurrent,
        }
    }

    /// The configured ceiling, zero meaning unbounded.
    #[must_use]
    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Wait for a free slot.
    ///
    /// When the returned permit is dropped, the slot becomes available for another task.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("semaphore is never closed")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use core::time::Duration;

    async fn max_in_flight(throttler: &Throttler, tasks: usize) -> usize {
        let active = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        let work = (0..tasks).map(|_| async {
            let _permit = throttler.acquire().await;
            let current = active.fetch_add(1, Ordering::SeqCst) + 1;
            _ = max_seen.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            _ = active.fetch_sub(1, Ordering::SeqCst);
        });

        _ = futures_util::future::join_all(work).await;
        max_seen.load(Ordering::SeqCst)
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn limits_concurrency() {
        let throttler = Throttler::new(2);
        assert_eq!(max_in_flight(&throttler, 10).await, 2);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort on Windows")]
    async fn zero_means_unbounded() {
        let throttler = Throttler::new(0);
        assert_eq!(throttler.max_concurrent(), 0);
        assert_eq!(max_in_flight(&throttler, 10).await, 10);
    }
}
