//! # OpaqueDB Workers - Bounded Cancelable Job Pool
//!
//! A generic worker pool over a bounded job queue. Producers choose between
//! a blocking [`WorkerPool::publish`] and a non-blocking
//! [`WorkerPool::try_publish`]; any task may also drain one pending job
//! in-line with [`WorkerPool::try_steal_work`] instead of idling.
//!
//! The pool moves through `Stopped -> Running -> ShuttingDown -> Stopped`
//! atomically. A process-wide shutdown signal transitions a running pool to
//! `ShuttingDown`; workers finish the job in flight and drain the queue.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Pool lifecycle states.
const STATE_STOPPED: u32 = 0;
const STATE_RUNNING: u32 = 1;
const STATE_SHUTTING_DOWN: u32 = 2;

/// Errors from pool lifecycle and publishing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool is not running.
    #[error("pool is not running")]
    Closed,

    /// `start` was called while the pool was running or shutting down.
    #[error("pool is already running or shutting down")]
    CannotStart,

    /// `start` was called twice with a job handler.
    #[error("job handler was already installed")]
    HandlerAlreadySet,
}

/// Monotonic job counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs accepted into the queue.
    pub published: u64,
    /// Jobs picked up by a worker or stealer.
    pub started: u64,
    /// Jobs that ran to completion.
    pub finished: u64,
}

/// A bounded pool of workers processing jobs of type `T`.
pub struct WorkerPool<T> {
    shared: Arc<Shared<T>>,
    shutdown: watch::Receiver<bool>,
}

struct Shared<T> {
    state: AtomicU32,
    capacity: usize,
    job_tx: Mutex<Option<mpsc::Sender<T>>>,
    job_rx: tokio::sync::Mutex<Option<mpsc::Receiver<T>>>,
    handler: Mutex<Option<Arc<dyn Fn(T) + Send + Sync>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    published: AtomicU64,
    started: AtomicU64,
    finished: AtomicU64,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a stopped pool with the given queue capacity. `shutdown`
    /// flipping to true stops a running pool.
    #[must_use]
    pub fn new(capacity: usize, shutdown: watch::Receiver<bool>) -> Self {
        debug!(capacity, "creating worker pool");
        Self {
            shared: Arc::new(Shared {
                state: AtomicU32::new(STATE_STOPPED),
                capacity,
                job_tx: Mutex::new(None),
                job_rx: tokio::sync::Mutex::new(None),
                handler: Mutex::new(None),
                workers: Mutex::new(Vec::new()),
                published: AtomicU64::new(0),
                started: AtomicU64::new(0),
                finished: AtomicU64::new(0),
            }),
            shutdown,
        }
    }

    /// Spawn `workers` tasks bound to the job handler `f`.
    pub fn start<F>(&self, workers: usize, f: F) -> Result<(), PoolError>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        if self
            .shared
            .state
            .compare_exchange(
                STATE_STOPPED,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(PoolError::CannotStart);
        }
        if self.shared.handler.lock().is_some() {
            self.shared.state.store(STATE_STOPPED, Ordering::Release);
            return Err(PoolError::HandlerAlreadySet);
        }

        let handler: Arc<dyn Fn(T) + Send + Sync> = Arc::new(f);
        *self.shared.handler.lock() = Some(Arc::clone(&handler));

        let (job_tx, job_rx) = mpsc::channel(self.shared.capacity);
        *self.shared.job_tx.lock() = Some(job_tx);
        // Nothing else can hold the receiver slot before workers spawn.
        if let Ok(mut rx_slot) = self.shared.job_rx.try_lock() {
            *rx_slot = Some(job_rx);
        }

        debug!(workers, "starting pool workers");
        let mut handles = self.shared.workers.lock();
        for _ in 0..workers {
            handles.push(tokio::spawn(Self::worker(
                Arc::clone(&self.shared),
                Arc::clone(&handler),
            )));
        }
        drop(handles);

        // Stop the pool when the process-wide signal fires.
        let shared = Arc::clone(&self.shared);
        let mut shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let changed = shutdown.changed().await;
            if changed.is_err() || *shutdown.borrow() {
                if let Err(e) = Shared::stop(&shared).await {
                    warn!(error = %e, "pool stop on shutdown failed");
                }
            }
        });

        Ok(())
    }

    /// Stop the pool: close the queue and wait for workers to drain it.
    pub async fn stop(&self) -> Result<(), PoolError> {
        Shared::stop(&self.shared).await
    }

    /// Add a job, waiting for queue space. Fails with [`PoolError::Closed`]
    /// when the pool is not running or the shutdown signal fires mid-wait.
    pub async fn publish(&self, job: T) -> Result<(), PoolError> {
        if self.shared.state.load(Ordering::Acquire) != STATE_RUNNING {
            return Err(PoolError::Closed);
        }
        let tx = self
            .shared
            .job_tx
            .lock()
            .clone()
            .ok_or(PoolError::Closed)?;

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            sent = tx.send(job) => match sent {
                Ok(()) => {
                    self.shared.published.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(_) => Err(PoolError::Closed),
            },
            _ = shutdown.changed() => Err(PoolError::Closed),
        }
    }

    /// Add a job without waiting. `Ok(false)` means the queue is full.
    pub fn try_publish(&self, job: T) -> Result<bool, PoolError> {
        if self.shared.state.load(Ordering::Acquire) != STATE_RUNNING {
            return Err(PoolError::Closed);
        }
        let tx = self
            .shared
            .job_tx
            .lock()
            .clone()
            .ok_or(PoolError::Closed)?;

        match tx.try_send(job) {
            Ok(()) => {
                self.shared.published.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("queue full, job not accepted");
                Ok(false)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PoolError::Closed),
        }
    }

    /// Dequeue and run one pending job on the calling task.
    ///
    /// Returns `Ok(true)` if a job was processed, `Ok(false)` if none were
    /// pending (or a worker holds the queue while idle).
    pub fn try_steal_work(&self) -> Result<bool, PoolError> {
        if self.shared.state.load(Ordering::Acquire) != STATE_RUNNING {
            return Err(PoolError::Closed);
        }
        let handler = self
            .shared
            .handler
            .lock()
            .clone()
            .ok_or(PoolError::Closed)?;

        let Ok(mut rx_slot) = self.shared.job_rx.try_lock() else {
            return Ok(false);
        };
        let Some(rx) = rx_slot.as_mut() else {
            return Err(PoolError::Closed);
        };

        match rx.try_recv() {
            Ok(job) => {
                drop(rx_slot);
                debug!("stole a pending job");
                self.shared.started.fetch_add(1, Ordering::Relaxed);
                handler(job);
                self.shared.finished.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(mpsc::error::TryRecvError::Empty) => Ok(false),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(PoolError::Closed),
        }
    }

    /// Snapshot of the monotonic job counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            published: self.shared.published.load(Ordering::Relaxed),
            started: self.shared.started.load(Ordering::Relaxed),
            finished: self.shared.finished.load(Ordering::Relaxed),
        }
    }

    async fn worker(shared: Arc<Shared<T>>, handler: Arc<dyn Fn(T) + Send + Sync>) {
        loop {
            let job = {
                let mut rx_slot = shared.job_rx.lock().await;
                let Some(rx) = rx_slot.as_mut() else { break };
                rx.recv().await
            };
            match job {
                Some(job) => {
                    shared.started.fetch_add(1, Ordering::Relaxed);
                    handler(job);
                    shared.finished.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    debug!("job queue closed, worker exiting");
                    break;
                }
            }
        }
    }
}

impl<T: Send + 'static> Shared<T> {
    async fn stop(shared: &Arc<Self>) -> Result<(), PoolError> {
        match shared.state.compare_exchange(
            STATE_RUNNING,
            STATE_SHUTTING_DOWN,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(STATE_STOPPED) => return Ok(()),
            Err(STATE_SHUTTING_DOWN) => {
                // Another caller is already draining; nothing to wait on
                // here without racing the handle collection.
                return Ok(());
            }
            Err(_) => return Err(PoolError::Closed),
        }

        // Closing the sender lets workers drain the queue and exit.
        drop(shared.job_tx.lock().take());

        let handles: Vec<_> = std::mem::take(&mut *shared.workers.lock());
        debug!(workers = handles.len(), "waiting for workers to stop");
        for handle in handles {
            let _ = handle.await;
        }

        shared.state.store(STATE_STOPPED, Ordering::Release);
        debug!("all workers stopped");
        Ok(())
    }
}
