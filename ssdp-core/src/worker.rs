//! Shared worker pool and cooperative cancellation.
//!
//! The long-running components (periodic sender, discover sender, multicast
//! listener) and their per-message send jobs all run on one fixed-size pool,
//! so a slow send never blocks a component's main loop. Cancellation is
//! cooperative: components poll a [`CancelToken`] at loop boundaries and use
//! it for their timed waits; nothing is preempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads draining a shared job queue.
///
/// Jobs submitted after [`WorkerPool::shutdown`] are dropped; jobs already
/// queued may still run. The pool never joins its workers — shutdown is a
/// best-effort signal, matching the engine's stop semantics.
pub struct WorkerPool {
    queue: Mutex<Option<mpsc::Sender<Job>>>,
}

impl WorkerPool {
    /// Spawn `size` worker threads (at least one).
    pub fn new(size: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        for index in 0..size.max(1) {
            let receiver = Arc::clone(&receiver);
            thread::Builder::new()
                .name(format!("ssdp-worker-{index}"))
                .spawn(move || loop {
                    let job = receiver.lock().recv();
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                })
                .expect("failed to spawn worker thread");
        }

        Self {
            queue: Mutex::new(Some(sender)),
        }
    }

    /// Queue a job for execution on the next free worker.
    ///
    /// A job submitted after shutdown is silently dropped (logged at debug).
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        match self.queue.lock().as_ref() {
            Some(sender) => {
                let _ = sender.send(Box::new(job));
            }
            None => debug!("worker pool is shut down, job dropped"),
        }
    }

    /// Stop accepting jobs and let workers exit once the queue drains.
    ///
    /// Idempotent. Does not wait for in-flight jobs.
    pub fn shutdown(&self) {
        self.queue.lock().take();
    }

    /// Whether [`WorkerPool::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.queue.lock().is_none()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// One-way cooperative cancellation signal with a cancellable timed wait.
///
/// Once cancelled, a token stays cancelled; components built around one
/// cannot be restarted.
#[derive(Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation, waking every in-progress [`CancelToken::wait_timeout`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Block for up to `timeout`, returning early when cancelled.
    ///
    /// Returns `true` when the token was cancelled (possibly before the
    /// call), `false` when the full timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();

        while !self.is_cancelled() {
            if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_cancelled()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
