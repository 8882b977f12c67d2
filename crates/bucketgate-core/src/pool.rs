//! Bounded worker pool for bulk transfers.
//!
//! A fixed number of workers drain a shared queue of pending jobs. Each job's
//! result goes back over a channel tagged with its submission index, so the
//! caller gets one result per job in submission order no matter which
//! worker finished it or when.
//!
//! Failures stay inside their job: an `Err` or a panic becomes that job's
//! result and the worker moves on to the next one. Workers run in a
//! [`JoinSet`], so dropping the future returned by [`WorkerPool::run`]
//! aborts whatever is still in flight.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of one job: its value, or a printable failure.
pub type JobResult<T> = Result<T, String>;

/// A fixed-size pool of async workers.
///
/// # Examples
///
/// ```
/// use bucketgate_core::pool::WorkerPool;
///
/// # tokio_test::block_on(async {
/// let pool = WorkerPool::new(2);
/// let results = pool
///     .run(vec![1_u32, 2, 3], |n| async move {
///         if n == 2 { Err(format!("{n} is unlucky")) } else { Ok(n * 10) }
///     })
///     .await;
/// assert_eq!(results, vec![Ok(10), Err("2 is unlucky".to_owned()), Ok(30)]);
/// # });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// A pool of `size` workers. Zero is treated as one.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    /// Number of workers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `work` over every job and return one result per job, in
    /// submission order.
    ///
    /// At most [`size`](Self::size) jobs are in flight at once.
    pub async fn run<J, T, E, F, Fut>(&self, jobs: Vec<J>, work: F) -> Vec<JobResult<T>>
    where
        J: Send + 'static,
        T: Send + 'static,
        E: Display,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }

        let queue: VecDeque<(usize, J)> = jobs.into_iter().enumerate().collect();
        let queue = Arc::new(Mutex::new(queue));
        let work = Arc::new(work);
        let (result_tx, mut result_rx) = mpsc::channel::<(usize, JobResult<T>)>(total);

        let workers = self.size.min(total);
        let mut set = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let work = Arc::clone(&work);
            let result_tx = result_tx.clone();
            set.spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, job)) = next else { break };

                    let result = AssertUnwindSafe(async { (*work)(job).await })
                        .catch_unwind()
                        .await
                        .map_err(|panic| format!("task panicked: {}", panic_message(&*panic)))
                        .and_then(|result| result.map_err(|e| e.to_string()));

                    if result_tx.send((index, result)).await.is_err() {
                        break;
                    }
                }
                debug!(worker, "worker drained queue");
            });
        }
        drop(result_tx);

        let mut slots: Vec<Option<JobResult<T>>> = (0..total).map(|_| None).collect();
        while let Some((index, result)) = result_rx.recv().await {
            slots[index] = Some(result);
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "worker task ended abnormally");
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err("worker stopped before the item ran".to_owned())))
            .collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
