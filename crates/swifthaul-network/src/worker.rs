//! Generic fixed-size worker pool

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Fixed number of long-lived workers consuming from a bounded job channel
///
/// Jobs are handled by the async closure given at construction. [`join`]
/// closes the job channel and drains everything already queued;
/// [`shutdown`] signals the quit channel instead, letting each worker
/// finish its current job and exit without draining the queue.
///
/// [`join`]: WorkerPool::join
/// [`shutdown`]: WorkerPool::shutdown
pub struct WorkerPool<J: Send + 'static> {
    job_tx: mpsc::Sender<J>,
    quit_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Spawn `workers` workers sharing a job queue of depth `queue_depth`
    pub fn new<F, Fut>(workers: usize, queue_depth: usize, handler: F) -> Self
    where
        F: Fn(J) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let workers = workers.max(1);
        let (job_tx, job_rx) = mpsc::channel::<J>(queue_depth.max(1));
        let (quit_tx, _) = broadcast::channel::<()>(workers);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let mut quit_rx = quit_tx.subscribe();
            let handler = handler.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = job_rx.lock().await;
                        tokio::select! {
                            _ = quit_rx.recv() => break,
                            job = rx.recv() => job,
                        }
                    };
                    match job {
                        Some(job) => handler(job).await,
                        None => break,
                    }
                }
                debug!("Worker {} stopped", id);
            }));
        }

        Self {
            job_tx,
            quit_tx,
            handles,
        }
    }

    /// Queue a job, waiting for channel capacity
    ///
    /// Returns the job back when the pool has already been stopped.
    pub async fn submit(&self, job: J) -> Result<(), J> {
        self.job_tx.send(job).await.map_err(|e| e.0)
    }

    /// Close the job channel and wait for workers to drain the queue
    pub async fn join(self) {
        drop(self.job_tx);
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    /// Signal quit and wait for workers to finish their current job
    ///
    /// Jobs still queued are dropped.
    pub async fn shutdown(self) {
        let _ = self.quit_tx.send(());
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    /// Number of workers in the pool
    pub fn workers(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_join_drains_all_jobs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let pool = WorkerPool::new(3, 8, move |n: usize| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(n, Ordering::SeqCst);
            }
        });
        assert_eq!(pool.workers(), 3);

        for n in 1..=10 {
            pool.submit(n).await.unwrap();
        }
        pool.join().await;
        assert_eq!(counter.load(Ordering::SeqCst), 55);
    }

    #[tokio::test]
    async fn test_shutdown_stops_without_draining() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        // single slow worker so queued jobs pile up
        let pool = WorkerPool::new(1, 32, move |_: usize| {
            let seen = Arc::clone(&seen);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        for n in 0..20 {
            pool.submit(n).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(75)).await;
        pool.shutdown().await;
        // far fewer than 20 handled; the current job still completed
        assert!(counter.load(Ordering::SeqCst) < 20);
    }

    #[tokio::test]
    async fn test_zero_workers_clamped_to_one() {
        let pool = WorkerPool::new(0, 1, |_: ()| async {});
        assert_eq!(pool.workers(), 1);
        pool.join().await;
    }
}
