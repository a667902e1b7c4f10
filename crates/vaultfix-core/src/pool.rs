//! Bounded task pool for concurrent daemon-driving actions.
//!
//! A test that must prompt several daemons at once gets a fresh pool with a
//! fixed worker count, its threads named after the owning test for
//! diagnosability. Teardown is non-blocking by design: in-flight work is not
//! cancelled and not waited for, trading strict reclamation for fast test
//! turnover. Callers must not assume submitted work has finished when the
//! test returns.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::error::{HarnessError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size worker pool, created fresh per test.
pub struct TaskPool {
    name: String,
    queue: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskPool {
    /// Spawns `workers` threads named `{name}-worker-{i}`.
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be spawned.
    pub fn new(name: impl Into<String>, workers: usize) -> Result<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let rx = Arc::clone(&rx);
            let handle = std::thread::Builder::new()
                .name(format!("{name}-worker-{i}"))
                .spawn(move || {
                    loop {
                        let job = rx.lock().recv();
                        match job {
                            Ok(job) => {
                                // A panicking task must not take the worker
                                // down with it; the submitter sees the loss
                                // through its dropped result channel.
                                let outcome =
                                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(job));
                                if outcome.is_err() {
                                    tracing::warn!("pool task panicked");
                                }
                            }
                            Err(_) => break,
                        }
                    }
                })?;
            handles.push(handle);
        }

        tracing::debug!(pool = %name, workers, "created task pool");

        Ok(Self {
            name,
            queue: Some(tx),
            workers: handles,
        })
    }

    /// Returns the pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submits a task, returning a handle to its eventual result.
    ///
    /// # Errors
    /// Returns [`HarnessError::PoolClosed`] if the pool has been shut down.
    pub fn submit<T, F>(&self, f: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            let _ = tx.send(f());
        });
        self.queue
            .as_ref()
            .ok_or(HarnessError::PoolClosed)?
            .send(job)
            .map_err(|_| HarnessError::PoolClosed)?;
        Ok(TaskHandle { rx })
    }

    /// Shuts the pool down.
    ///
    /// The queue is closed either way. With `wait` the workers are joined;
    /// without it they are detached and may finish after the caller returns
    /// (the documented looseness of fixture teardown).
    pub fn shutdown(mut self, wait: bool) {
        self.queue = None;
        let workers = std::mem::take(&mut self.workers);
        tracing::debug!(pool = %self.name, wait, "shutting down task pool");
        if wait {
            for handle in workers {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // Equivalent to shutdown(false): close the queue, detach workers.
        self.queue = None;
    }
}

/// Handle to a submitted task's result.
pub struct TaskHandle<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task completes and returns its result.
    ///
    /// # Errors
    /// Returns [`HarnessError::PoolClosed`] if the task was lost (the pool
    /// was dropped before it ran, or it panicked).
    pub fn join(self) -> Result<T> {
        self.rx.recv().map_err(|_| HarnessError::PoolClosed)
    }

    /// Returns the result if the task already completed.
    #[must_use]
    pub fn try_join(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_tasks_run_and_return_results() {
        let pool = TaskPool::new("test_concurrent_spend", 4).unwrap();
        let handles: Vec<_> = (0u32..8)
            .map(|i| pool.submit(move || i * 2).unwrap())
            .collect();
        let mut results: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_unstable();
        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_workers_named_after_test() {
        let pool = TaskPool::new("test_revault_calls", 1).unwrap();
        let name = pool
            .submit(|| std::thread::current().name().map(String::from))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name.as_deref(), Some("test_revault_calls-worker-0"));
    }

    #[test]
    fn test_shutdown_without_wait_does_not_block() {
        let pool = TaskPool::new("test_slow", 1).unwrap();
        let handle = pool
            .submit(|| std::thread::sleep(Duration::from_millis(500)))
            .unwrap();

        let start = Instant::now();
        pool.shutdown(false);
        assert!(start.elapsed() < Duration::from_millis(200));

        // The in-flight task still completes on the detached worker.
        handle.join().unwrap();
    }

    #[test]
    fn test_shutdown_with_wait_joins_workers() {
        let pool = TaskPool::new("test_wait", 2).unwrap();
        let h1 = pool.submit(|| 1).unwrap();
        let h2 = pool.submit(|| 2).unwrap();
        pool.shutdown(true);
        assert_eq!(h1.join().unwrap(), 1);
        assert_eq!(h2.join().unwrap(), 2);
    }

    #[test]
    fn test_panicking_task_does_not_kill_pool() {
        let pool = TaskPool::new("test_panicky", 1).unwrap();
        let bad = pool.submit(|| panic!("boom")).unwrap();
        assert!(bad.join().is_err());
        // Same single worker still serves later tasks.
        let ok = pool.submit(|| 42).unwrap();
        assert_eq!(ok.join().unwrap(), 42);
    }

    #[test]
    fn test_join_after_pool_dropped_before_run() {
        let pool = TaskPool::new("test_dropped", 1).unwrap();
        let blocker = pool
            .submit(|| std::thread::sleep(Duration::from_millis(100)))
            .unwrap();
        let queued = pool.submit(|| 7).unwrap();
        drop(pool);
        // The detached worker drains what was already queued.
        blocker.join().unwrap();
        assert_eq!(queued.join().unwrap(), 7);
    }
}
