//! Bounded concurrent fetching.
//!
//! [`FetchPool::run`] maps a fetch function over a batch of independent
//! items with at most `max_workers` fetches in flight. Each item produces
//! exactly one [`Outcome`]; a failed item is logged and reported back
//! without disturbing the rest of the batch.

use futures::FutureExt;
use indicatif::ProgressBar;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// An item whose fetch did not succeed.
#[derive(Debug)]
pub struct FetchFailure<I> {
    pub item: I,
    pub error: anyhow::Error,
}

/// Result envelope sent from a worker to the collector, one per item.
enum Outcome<I, T> {
    Fetched(T),
    Failed(FetchFailure<I>),
}

/// Everything a pool run produced. `fetched` is in completion order.
#[derive(Debug)]
pub struct PoolReport<I, T> {
    pub fetched: Vec<T>,
    pub failed: Vec<FetchFailure<I>>,
}

impl<I, T> Default for PoolReport<I, T> {
    fn default() -> Self {
        Self {
            fetched: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<I, T> PoolReport<I, T> {
    /// Number of items that were attempted.
    pub fn attempted(&self) -> usize {
        self.fetched.len() + self.failed.len()
    }
}

/// A fixed-size group of workers draining one job queue.
///
/// The pool holds no tasks between calls: workers are spawned by `run` and
/// joined before it returns.
#[derive(Debug, Clone)]
pub struct FetchPool {
    name: &'static str,
    max_workers: usize,
    progress: Option<ProgressBar>,
}

impl FetchPool {
    /// Create a pool that runs at most `max_workers` fetches at once.
    pub fn new(name: &'static str, max_workers: usize) -> Self {
        Self {
            name,
            max_workers: max_workers.max(1),
            progress: None,
        }
    }

    /// Tick `progress` once per finished item.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Number of workers used for a batch of `items` items.
    pub fn worker_count(&self, items: usize) -> usize {
        self.max_workers.min(items)
    }

    /// Fetch every item and wait for all of them.
    ///
    /// The call itself never fails: errors and panics inside `fetch` become
    /// entries in [`PoolReport::failed`].
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, fetch: F) -> PoolReport<I, T>
    where
        I: Clone + Display + Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let total = items.len();
        if total == 0 {
            return PoolReport::default();
        }

        let workers = self.worker_count(total);
        debug!("{} pool: {} items across {} workers", self.name, total, workers);

        if let Some(ref pb) = self.progress {
            pb.set_length(total as u64);
            pb.set_position(0);
        }

        let jobs = Arc::new(Mutex::new(VecDeque::from(items)));
        let fetch = Arc::new(fetch);
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<Outcome<I, T>>();

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let jobs = Arc::clone(&jobs);
            let fetch = Arc::clone(&fetch);
            let outcome_tx = outcome_tx.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let next = jobs.lock().await.pop_front();
                    let Some(item) = next else { break };

                    let input = item.clone();
                    let call = Arc::clone(&fetch);
                    let attempt = AssertUnwindSafe(async move { call(input).await })
                        .catch_unwind()
                        .await;

                    let outcome = match attempt {
                        Ok(Ok(value)) => Outcome::Fetched(value),
                        Ok(Err(error)) => Outcome::Failed(FetchFailure { item, error }),
                        Err(panic) => Outcome::Failed(FetchFailure {
                            item,
                            error: anyhow::anyhow!("fetch panicked: {}", panic_message(&*panic)),
                        }),
                    };

                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
            }));
        }
        // Only workers hold senders now; the channel closes when the last one exits.
        drop(outcome_tx);

        let mut report = PoolReport::default();
        while let Some(outcome) = outcome_rx.recv().await {
            match outcome {
                Outcome::Fetched(value) => report.fetched.push(value),
                Outcome::Failed(failure) => {
                    warn!("failed to fetch {}: {:#}", failure.item, failure.error);
                    report.failed.push(failure);
                }
            }
            if let Some(ref pb) = self.progress {
                pb.inc(1);
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("{} pool worker exited abnormally: {}", self.name, e);
            }
        }

        if let Some(ref pb) = self.progress {
            pb.finish_and_clear();
        }

        debug!(
            "{} pool: {} fetched, {} failed",
            self.name,
            report.fetched.len(),
            report.failed.len()
        );
        debug_assert_eq!(report.attempted(), total);

        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many fetches are running and the highest value seen.
    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl InFlight {
        fn enter(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_worker_count_is_capped_by_items() {
        let pool = FetchPool::new("test", 10);
        assert_eq!(pool.worker_count(3), 3);
        assert_eq!(pool.worker_count(10), 10);
        assert_eq!(pool.worker_count(25), 10);
        assert_eq!(FetchPool::new("zero", 0).worker_count(4), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = FetchPool::new("test", 4);
        let report = pool
            .run(Vec::<u32>::new(), |n| async move { Ok(n) })
            .await;
        assert_eq!(report.attempted(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_partial_failure_covers_every_item_once() {
        let pool = FetchPool::new("test", 5);
        let items: Vec<u32> = (0..40).collect();

        let report = pool
            .run(items, |n| async move {
                if n % 3 == 0 {
                    anyhow::bail!("item {} unavailable", n);
                }
                Ok(n * 10)
            })
            .await;

        assert_eq!(report.fetched.len(), 26);
        assert_eq!(report.failed.len(), 14);

        let mut seen = HashSet::new();
        for value in &report.fetched {
            assert!(seen.insert(value / 10), "duplicate outcome for {}", value / 10);
        }
        for failure in &report.failed {
            assert!(seen.insert(failure.item), "duplicate outcome for {}", failure.item);
            assert!(failure.error.to_string().contains("unavailable"));
        }
        assert_eq!(seen.len(), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panicking_fetch_becomes_failure() {
        let pool = FetchPool::new("test", 3);
        let report = pool
            .run(vec![1u32, 2, 3, 4], |n| async move {
                if n == 2 {
                    panic!("boom on {}", n);
                }
                Ok(n)
            })
            .await;

        assert_eq!(report.fetched.len(), 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].item, 2);
        assert!(report.failed[0].error.to_string().contains("boom on 2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_in_flight_never_exceeds_cap() {
        let tracker = Arc::new(InFlight::default());
        let pool = FetchPool::new("test", 4);

        let fetch_tracker = Arc::clone(&tracker);
        let report = pool
            .run((0..30).collect::<Vec<u32>>(), move |n| {
                let tracker = Arc::clone(&fetch_tracker);
                async move {
                    tracker.enter();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    tracker.exit();
                    Ok(n)
                }
            })
            .await;

        assert_eq!(report.fetched.len(), 30);
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 30);
        assert!(tracker.peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(tracker.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_twelve_items_take_two_rounds() {
        let tracker = Arc::new(InFlight::default());
        let pool = FetchPool::new("discovery", 10);

        let fetch_tracker = Arc::clone(&tracker);
        let started = tokio::time::Instant::now();
        let report = pool
            .run((0..12).collect::<Vec<u32>>(), move |n| {
                let tracker = Arc::clone(&fetch_tracker);
                async move {
                    tracker.enter();
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    tracker.exit();
                    Ok(vec![n])
                }
            })
            .await;
        let elapsed = started.elapsed();

        assert_eq!(report.fetched.len(), 12);
        assert!(report.failed.is_empty());
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 10);
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }

    #[test]
    fn test_progress_reaches_total() {
        let pb = ProgressBar::hidden();
        let pool = FetchPool::new("test", 2).with_progress(pb.clone());
        let report = tokio_test::block_on(pool.run(vec!["a", "b", "c"], |s| async move {
            if s == "b" {
                anyhow::bail!("nope");
            }
            Ok(s.len())
        }));

        assert_eq!(report.attempted(), 3);
        assert_eq!(pb.position(), 3);
    }
}
