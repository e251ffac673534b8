//! Fixed-size worker pool with an explicit job queue.
//!
//! Each stage owns one pool. Jobs go through a bounded queue so the feeder
//! never runs far ahead of the workers; results come back over a channel to
//! the driver in completion order.

use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Runs a task over many inputs with exactly `workers` concurrent workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    abort: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Create a pool with its own abort flag.
    pub fn new(workers: usize) -> Self {
        Self::with_abort(workers, Arc::new(AtomicBool::new(false)))
    }

    /// Create a pool that stops taking jobs once `abort` is set.
    pub fn with_abort(workers: usize, abort: Arc<AtomicBool>) -> Self {
        Self {
            workers: workers.max(1),
            abort,
        }
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether the abort flag has been raised.
    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Run `task` over `items`, calling `on_result` as each unit completes.
    ///
    /// Workers check the abort flag before and after taking the next job; a
    /// unit that has started always runs to completion. Results are returned in
    /// completion order.
    pub async fn run<T, R, F, Fut, C>(&self, items: Vec<T>, task: F, mut on_result: C) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        C: FnMut(&R),
    {
        if items.is_empty() {
            return Vec::new();
        }

        let total = items.len();
        let worker_count = self.workers.min(total);
        let (job_tx, job_rx) = mpsc::channel::<T>(worker_count * 2);
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<R>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let task = Arc::new(task);

        let feeder = tokio::spawn(async move {
            for item in items {
                if job_tx.send(item).await.is_err() {
                    // every worker has exited
                    break;
                }
            }
        });

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let task = task.clone();
            let abort = self.abort.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut queue = job_rx.lock().await;
                        // the flag may have been raised while this worker waited for the lock
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        queue.recv().await
                    };
                    let Some(job) = job else { break };
                    if abort.load(Ordering::SeqCst) {
                        break;
                    }
                    if result_tx.send(task(job).await).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);
        drop(job_rx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = result_rx.recv().await {
            on_result(&result);
            results.push(result);
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
        feeder.abort();

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_item_is_processed_once() {
        let pool = WorkerPool::new(8);
        let items: Vec<u32> = (0..250).collect();
        let mut seen = 0usize;

        let mut results = pool
            .run(items, |n| async move { n * 2 }, |_| seen += 1)
            .await;
        results.sort_unstable();

        assert_eq!(seen, 250);
        assert_eq!(results, (0..250).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_worker_count() {
        let pool = WorkerPool::new(4);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let task = {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            move |_: usize| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }
        };

        let results = pool.run((0..40).collect(), task, |_| {}).await;
        assert_eq!(results.len(), 40);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_abort_stops_taking_new_jobs() {
        let abort = Arc::new(AtomicBool::new(false));
        let pool = WorkerPool::with_abort(2, abort.clone());

        let mut completed = 0usize;
        let results = pool
            .run(
                (0..1000).collect::<Vec<u32>>(),
                |n| async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    n
                },
                |_| {
                    completed += 1;
                    if completed == 10 {
                        abort.store(true, Ordering::SeqCst);
                    }
                },
            )
            .await;

        assert!(pool.is_aborted());
        assert!(results.len() >= 10);
        assert!(results.len() < 1000);
    }

    #[tokio::test]
    async fn test_no_unit_starts_after_abort() {
        let abort = Arc::new(AtomicBool::new(false));
        let pool = WorkerPool::with_abort(4, abort.clone());
        let started_after_abort = Arc::new(AtomicUsize::new(0));

        let task = {
            let abort = abort.clone();
            let started_after_abort = started_after_abort.clone();
            move |n: u32| {
                let abort = abort.clone();
                let started_after_abort = started_after_abort.clone();
                async move {
                    if abort.load(Ordering::SeqCst) {
                        started_after_abort.fetch_add(1, Ordering::SeqCst);
                    }
                    if n == 10 {
                        abort.store(true, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    n
                }
            }
        };

        let results = pool.run((0..200).collect(), task, |_| {}).await;

        assert_eq!(started_after_abort.load(Ordering::SeqCst), 0);
        assert!(results.contains(&10));
        assert!(results.len() < 200);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let pool = WorkerPool::new(3);
        let results: Vec<u8> = pool.run(Vec::<u8>::new(), |n| async move { n }, |_| {}).await;
        assert!(results.is_empty());
    }
}
