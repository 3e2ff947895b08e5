//! Bounded pool of worker threads for thumbnail generation.
//!
//! Units are queued on a channel shared by a fixed number of threads, so at most
//! `num_workers` generators run at once. A panicking unit is logged and the worker
//! moves on to the next one.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use thumbview_logging::{thumb_debug, thumb_error};

/// One unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shutting down")]
    ShuttingDown,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

pub struct WorkerPool {
    sender: Option<mpsc::Sender<Task>>,
    workers: Vec<Worker>,
    closed: AtomicBool,
}

impl WorkerPool {
    /// Spawns `num_workers` threads; zero is treated as one.
    pub fn new(num_workers: usize) -> Result<Self, PoolError> {
        let num_workers = num_workers.max(1);
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));

        // Threads spawned before a failure are joined when `pool` drops.
        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(num_workers),
            closed: AtomicBool::new(false),
        };
        for id in 0..num_workers {
            pool.workers.push(Worker::spawn(id, receiver.clone())?);
        }
        thumb_debug!("worker pool started with {num_workers} threads");
        Ok(pool)
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queues a unit. Rejected once the pool is closed; the caller still owns
    /// whatever bookkeeping the unit would have done.
    pub fn submit(&self, task: Task) -> Result<(), PoolError> {
        if self.is_closed() {
            return Err(PoolError::ShuttingDown);
        }
        let sender = self.sender.as_ref().ok_or(PoolError::ShuttingDown)?;
        sender.send(task).map_err(|_| PoolError::ShuttingDown)
    }

    /// Stops accepting work. Queued units still run.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Closes the pool, lets queued units finish and waits for every thread.
    pub fn shutdown(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        self.close();
        // Dropping the sender ends each worker's loop once the queue drains.
        self.sender.take();
        for worker in self.workers.drain(..) {
            worker.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join_all();
    }
}

struct Worker {
    id: usize,
    thread: JoinHandle<()>,
}

impl Worker {
    fn spawn(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Task>>>) -> Result<Self, PoolError> {
        let thread = thread::Builder::new()
            .name(format!("thumb-worker-{id}"))
            .spawn(move || Self::run(id, receiver))?;
        Ok(Self { id, thread })
    }

    fn run(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Task>>>) {
        loop {
            // The guard is a temporary, so the lock is released before the task runs.
            let message = receiver
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv();
            let Ok(task) = message else {
                break;
            };
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                thumb_error!("worker {id}: unit panicked");
            }
        }
    }

    fn join(self) {
        if self.thread.join().is_err() {
            thumb_error!("worker {} terminated abnormally", self.id);
        }
    }
}
