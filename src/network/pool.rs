//! Worker pool
//!
//! A fixed set of threads pulling jobs from a bounded queue. The number of
//! workers caps how many connections are served at once; the queue caps how
//! many accepted connections may wait.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::error::{KnowsqlError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bounded pool of worker threads
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Start `workers` threads sharing a queue of `queue_capacity` jobs
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self> {
        if workers == 0 {
            return Err(KnowsqlError::Config(
                "worker pool needs at least one thread".to_string(),
            ));
        }

        let (sender, receiver) = channel::bounded::<Job>(queue_capacity);
        let active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let active = Arc::clone(&active);
            let handle = thread::Builder::new()
                .name(format!("knowsql-worker-{}", id))
                .spawn(move || worker_loop(receiver, active))?;
            handles.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers: handles,
            active,
        })
    }

    /// Queue a job, failing with [`KnowsqlError::ServerBusy`] when the
    /// queue is full. The rejected job is dropped without running.
    pub fn try_spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(KnowsqlError::ServerBusy)?;
        sender.try_send(Box::new(job)).map_err(|e| match e {
            TrySendError::Full(_) | TrySendError::Disconnected(_) => KnowsqlError::ServerBusy,
        })
    }

    /// Jobs currently running
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Jobs waiting for a worker
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue and wait for every worker to finish
    pub fn join(mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Worker thread exited abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets idle workers exit; busy ones finish first.
        self.sender.take();
    }
}

fn worker_loop(receiver: Receiver<Job>, active: Arc<AtomicUsize>) {
    while let Ok(job) = receiver.recv() {
        active.fetch_add(1, Ordering::SeqCst);
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("Connection worker panicked; continuing");
        }
        active.fetch_sub(1, Ordering::SeqCst);
    }
}
