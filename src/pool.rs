//! Bounded worker pool for blocking, CPU-bound work.
//!
//! The request dispatcher in this crate is a single-threaded cooperative
//! context; it must never run image decoding or encoding itself. Everything
//! blocking goes through [`WorkerPool::submit`], which returns immediately
//! at the `.await` points and resolves once a worker has finished the job.
//!
//! ## Shape
//!
//! - An **unbounded admission queue** accepts every submission — backpressure
//!   is absorbed by queueing, nothing is rejected for waiting too long.
//! - A single **dispatch task** drains the queue. For each item it first
//!   awaits a permit from a semaphore sized to the worker count, then hands
//!   the closure to a blocking thread. At most `workers` items execute
//!   concurrently, no matter how deep the queue gets.
//! - Completion is delivered through a oneshot back to the submitter's own
//!   task context, so result handling never races with other completions on
//!   the dispatcher.
//!
//! ## Failure
//!
//! A panicking work item is caught and redelivered to its submitter as
//! [`PoolError::Panicked`]; the dispatch loop and every other in-flight item
//! carry on. Fallible work should return a `Result` and let the caller
//! flatten it — the pool treats any returned value as opaque.
//!
//! Dropping the pool closes the admission queue: queued-but-unstarted work
//! still runs to completion (its submitters have usually gone away and the
//! results are discarded), and new submissions fail with
//! [`PoolError::Closed`]. There is no mid-job cancellation.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc, oneshot};

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("worker pool has shut down")]
    Closed,
    #[error("worker panicked: {0}")]
    Panicked(String),
}

struct Job {
    run: Box<dyn FnOnce() + Send + 'static>,
}

/// A fixed-size pool of blocking workers fed by an unbounded queue.
pub struct WorkerPool {
    queue: mpsc::UnboundedSender<Job>,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` concurrent execution slots.
    ///
    /// Must be called from within a tokio runtime: the dispatch loop is
    /// spawned onto the current runtime. `workers` is clamped to at least 1.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(workers));
        tokio::spawn(dispatch(rx, gate));
        Self { queue: tx, workers }
    }

    /// Create a pool sized to the host's CPU count.
    pub fn with_default_workers() -> Self {
        Self::new(default_workers())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` on a pool worker and await its result.
    ///
    /// The item is enqueued immediately, before the returned future is first
    /// polled; the future then suspends while the item waits for a free slot
    /// and executes. The caller's context is never blocked.
    pub fn submit<F, T>(
        &self,
        work: F,
    ) -> impl std::future::Future<Output = Result<T, PoolError>> + use<F, T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let run = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
                let message = panic_message(&payload);
                tracing::error!(%message, "work item panicked");
                message
            });
            // The submitter may have been dropped; a dead receiver is fine.
            let _ = reply_tx.send(outcome);
        });
        let sent = self
            .queue
            .send(Job { run })
            .map_err(|_| PoolError::Closed);

        async move {
            sent?;
            match reply_rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => Err(PoolError::Panicked(message)),
                Err(_) => Err(PoolError::Closed),
            }
        }
    }
}

/// Number of workers to use when the configuration does not say: one per
/// available CPU.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

async fn dispatch(mut queue: mpsc::UnboundedReceiver<Job>, gate: Arc<Semaphore>) {
    while let Some(job) = queue.recv().await {
        // The semaphore is never closed, so acquisition only fails if the
        // whole process is tearing down.
        let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
            break;
        };
        tokio::task::spawn_blocking(move || {
            (job.run)();
            drop(permit);
        });
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
