//! Bounded worker pool behind the `_async` operations.
//!
//! Jobs go through a bounded channel served by a fixed set of threads. A
//! full queue refuses new work instead of growing, and every submission can
//! be cancelled until a worker picks it up.

use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{bounded, Sender, TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::ClientOptions;
use crate::error::{Error, Result};

/// Receives the outcome of an async operation, on a worker thread.
pub trait Completion<T>: Send + 'static {
    /// Called with the result of a successful operation.
    fn on_success(self, value: T);

    /// Called when the operation failed or was cancelled.
    fn on_failure(self, error: Error);
}

/// A [`Completion`] made of two closures.
pub struct Callbacks<S, F> {
    success: S,
    failure: F,
}

/// Builds a [`Completion`] from a success and a failure closure.
#[must_use]
pub fn callbacks<T, S, F>(on_success: S, on_failure: F) -> Callbacks<S, F>
where
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    Callbacks {
        success: on_success,
        failure: on_failure,
    }
}

impl<T, S, F> Completion<T> for Callbacks<S, F>
where
    S: FnOnce(T) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    fn on_success(self, value: T) {
        (self.success)(value);
    }

    fn on_failure(self, error: Error) {
        (self.failure)(error);
    }
}

/// Forwards the outcome to a channel.
impl<T: Send + 'static> Completion<T> for Sender<Result<T>> {
    fn on_success(self, value: T) {
        let _ = self.send(Ok(value));
    }

    fn on_failure(self, error: Error) {
        let _ = self.send(Err(error));
    }
}

/// Handle to a queued operation.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    /// Cancels the operation if no worker has started it yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The underlying token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// A queued operation that owns its completion.
trait Task: Send {
    fn run(self: Box<Self>);

    /// Reports `error` without running the work.
    fn reject(self: Box<Self>, error: Error);
}

struct Queued<T, W, C> {
    token: CancellationToken,
    work: W,
    completion: C,
    _output: PhantomData<fn() -> T>,
}

impl<T, W, C> Task for Queued<T, W, C>
where
    T: Send + 'static,
    W: FnOnce() -> Result<T> + Send + 'static,
    C: Completion<T>,
{
    fn run(self: Box<Self>) {
        let Self {
            token,
            work,
            completion,
            ..
        } = *self;
        if token.is_cancelled() {
            completion.on_failure(Error::Cancelled);
            return;
        }
        match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => completion.on_success(value),
            Ok(Err(e)) => completion.on_failure(e),
            Err(_) => {
                error!("Async job panicked");
                completion.on_failure(Error::Panicked);
            }
        }
    }

    fn reject(self: Box<Self>, error: Error) {
        self.completion.on_failure(error);
    }
}

type Job = Box<dyn Task>;

/// Fixed pool of worker threads fed by a bounded queue.
///
/// Dropping the pool closes the queue; workers finish the jobs already
/// queued and exit. They are not joined.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Sender<Job>,
    workers: usize,
}

impl WorkerPool {
    /// Starts the worker threads.
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        let workers = options.workers.max(1);
        let (sender, receiver) = bounded::<Job>(options.queue_capacity.max(1));

        let mut started = 0;
        for index in 0..workers {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("rowlink-worker-{index}"))
                .spawn(move || {
                    for job in receiver.iter() {
                        // A panicking completion must not take the worker down.
                        if panic::catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
                            error!("Async completion panicked");
                        }
                    }
                });
            match spawned {
                Ok(_) => started += 1,
                Err(e) => error!(index, error = %e, "Failed to start worker thread"),
            }
        }
        debug!(workers = started, queue_capacity = options.queue_capacity, "Worker pool started");

        Self {
            sender,
            workers: started,
        }
    }

    /// Number of running worker threads.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    /// Queues `work`; its outcome goes to `completion`.
    ///
    /// A panic inside `work` is reported as [`Error::Panicked`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when the queue is at capacity and
    /// [`Error::PoolClosed`] when the workers are gone. The completion
    /// receives the same error through `on_failure` before this returns.
    pub fn submit<T, W, C>(&self, work: W, completion: C) -> Result<TaskHandle>
    where
        T: Send + 'static,
        W: FnOnce() -> Result<T> + Send + 'static,
        C: Completion<T>,
    {
        let token = CancellationToken::new();
        let job: Job = Box::new(Queued {
            token: token.clone(),
            work,
            completion,
            _output: PhantomData,
        });

        match self.sender.try_send(job) {
            Ok(()) => Ok(TaskHandle { token }),
            Err(TrySendError::Full(job)) => {
                warn!(capacity = self.sender.capacity(), "Worker queue full, refusing job");
                job.reject(Error::QueueFull);
                Err(Error::QueueFull)
            }
            Err(TrySendError::Disconnected(job)) => {
                error!("Worker queue closed, refusing job");
                job.reject(Error::PoolClosed);
                Err(Error::PoolClosed)
            }
        }
    }
}
