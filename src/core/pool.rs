//! Elastic pool: sizing policy, task routing and idle eviction.
//!
//! Each submission takes exactly one of four routes:
//!
//! 1. Fewer than `min_workers` live: spawn a worker that runs the task directly.
//! 2. Queue appears to have room: enqueue.
//! 3. Queue full and fewer than `max_workers` live: spawn a worker for the task.
//! 4. Queue full at `max_workers`: block until a worker drains a slot.
//!
//! The room check in step 2 and the enqueue that follows are separate steps.
//! Two submitters can both see one free slot; the loser then blocks in the
//! send exactly as in step 4. Routing is best effort, not a guarantee.
//!
//! Idle workers wait on the queue for `idle_timeout` at a time. When the timer
//! fires and more than `min_workers` are live, the worker leaves. Under
//! [`EvictionPolicy::Approximate`] that check reads a count other idle workers
//! may be acting on at the same moment, so the pool can briefly drop below its
//! minimum until new submissions repopulate it.
//!
//! A leaving worker deregisters and then looks at the queue once more; a
//! submitter that enqueued looks at the live count once more. Whichever side
//! comes second sees the other, so a queued task is never left without a
//! worker when the last one leaves.

use std::sync::atomic::{self, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::builders::PoolBuilder;
use crate::config::{EvictionPolicy, PoolConfig, DEFAULT_QUEUE_CAPACITY};

use super::task::notify_guarded;
use super::{FailureHandler, Job, PoolError, Registry, TaskFailure, WorkSource, Worker, WorkerId};

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Workers currently registered.
    pub live_workers: usize,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Tasks accepted by `submit`.
    pub submitted_tasks: u64,
    /// Tasks that ran to completion or panicked.
    pub completed_tasks: u64,
    /// Tasks that panicked.
    pub failed_tasks: u64,
    /// Workers started over the pool's lifetime.
    pub spawned_workers: u64,
    /// Workers that left because they idled out.
    pub evicted_workers: u64,
    /// Configured minimum.
    pub min_workers: usize,
    /// Configured maximum.
    pub max_workers: usize,
    /// Queue capacity.
    pub queue_capacity: usize,
}

#[derive(Debug, Default)]
struct PoolCounters {
    submitted_tasks: AtomicU64,
    completed_tasks: AtomicU64,
    failed_tasks: AtomicU64,
    spawned_workers: AtomicU64,
    evicted_workers: AtomicU64,
}

/// State shared between the pool handle and its workers.
///
/// Holds the receiving half of the queue only; workers observe disconnection
/// once every pool-side sender is gone.
pub(crate) struct PoolShared {
    config: PoolConfig,
    min_workers: usize,
    queue_capacity: usize,
    task_rx: Receiver<Job>,
    registry: Registry,
    counters: PoolCounters,
    failure_handler: Option<Arc<dyn FailureHandler>>,
    drained: (Mutex<()>, Condvar),
}

impl PoolShared {
    fn evict(&self, id: WorkerId) -> bool {
        let allowed = match self.config.eviction {
            EvictionPolicy::Approximate => self.registry.len() > self.min_workers,
            EvictionPolicy::Strict => self.registry.release_above(id, self.min_workers),
        };
        if allowed {
            self.counters.evicted_workers.fetch_add(1, Ordering::Relaxed);
        }
        allowed
    }

    /// Deregister an evicted worker, unless a task arrived while it was deciding.
    fn leave(&self, id: WorkerId) -> Result<Job, PoolError> {
        self.deregister(id);
        atomic::fence(Ordering::SeqCst);
        match self.task_rx.try_recv() {
            Ok(job) => {
                self.registry.register(id);
                self.counters.evicted_workers.fetch_sub(1, Ordering::Relaxed);
                debug!(worker = %id, "Task arrived during eviction, staying");
                Ok(job)
            }
            Err(_) => Err(PoolError::NoWork),
        }
    }
}

impl WorkSource for PoolShared {
    fn acquire(&self, id: WorkerId) -> Result<Job, PoolError> {
        loop {
            match self.task_rx.recv_timeout(self.config.idle_timeout) {
                Ok(job) => return Ok(job),
                Err(RecvTimeoutError::Disconnected) => return Err(PoolError::Disconnected),
                Err(RecvTimeoutError::Timeout) => {}
            }
            if self.evict(id) {
                return self.leave(id);
            }
            trace!(worker = %id, live = self.registry.len(), "Idle at minimum staffing, waiting again");
        }
    }

    fn deregister(&self, id: WorkerId) {
        self.registry.deregister(id);
        let (lock, cvar) = &self.drained;
        let _guard = lock.lock();
        cvar.notify_all();
    }

    fn task_finished(&self, failure: Option<TaskFailure>) {
        self.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
        if let Some(failure) = failure {
            self.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
            if let Some(handler) = &self.failure_handler {
                if let Err(message) = notify_guarded(handler.as_ref(), failure) {
                    error!(panic = %message, "Failure handler panicked");
                }
            }
        }
    }
}

/// Elastic worker pool.
///
/// Share it across submitting threads with an `Arc`. Dropping the pool closes
/// the queue: workers finish everything already queued, then exit.
pub struct Pool {
    shared: Arc<PoolShared>,
    task_tx: RwLock<Option<Sender<Job>>>,
}

impl Pool {
    /// Create a pool from raw bounds.
    ///
    /// A negative `min` selects one worker per CPU, `max` below `min` is raised
    /// to `min`, and `idle_timeout` below [`crate::config::MIN_IDLE_TIMEOUT`]
    /// is clamped up.
    #[must_use]
    pub fn new(min: isize, max: isize, idle_timeout: Duration) -> Self {
        Self::from_parts(PoolConfig::from_bounds(min, max, idle_timeout), None)
    }

    /// Create a pool from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        PoolBuilder::new(config).build()
    }

    /// Start building a pool with optional extras such as a failure handler.
    #[must_use]
    pub fn builder(config: PoolConfig) -> PoolBuilder {
        PoolBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: PoolConfig,
        failure_handler: Option<Arc<dyn FailureHandler>>,
    ) -> Self {
        let config = config.normalized();
        let min_workers = config.resolved_min_workers();
        let (task_tx, task_rx) = bounded::<Job>(DEFAULT_QUEUE_CAPACITY);

        info!(
            min_workers,
            max_workers = config.max_workers,
            idle_timeout_ms = u64::try_from(config.idle_timeout.as_millis()).unwrap_or(u64::MAX),
            queue_capacity = DEFAULT_QUEUE_CAPACITY,
            eviction = ?config.eviction,
            "Elastic pool initialized"
        );

        Self {
            shared: Arc::new(PoolShared {
                config,
                min_workers,
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
                task_rx,
                registry: Registry::new(),
                counters: PoolCounters::default(),
                failure_handler,
                drained: (Mutex::new(()), Condvar::new()),
            }),
            task_tx: RwLock::new(Some(task_tx)),
        }
    }

    /// Submit a closure for execution.
    ///
    /// May block while the pool is at `max_workers` and the queue is full.
    ///
    /// # Errors
    ///
    /// - `PoolError::Disconnected` after [`Pool::shutdown`]
    /// - `PoolError::WorkerSpawn` if a needed worker thread could not start
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute(Some(Box::new(task)))
    }

    /// Submit a closure, waiting at most `timeout` for queue space.
    ///
    /// # Errors
    ///
    /// As [`Pool::submit`], plus `PoolError::SubmitTimeout` if the queue stayed
    /// full for the whole `timeout`. The task is dropped without running.
    pub fn submit_timeout<F>(&self, task: F, timeout: Duration) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute_timeout(Some(Box::new(task)), timeout)
    }

    /// Submit an optional boxed task.
    ///
    /// # Errors
    ///
    /// `PoolError::InvalidTask` when `task` is `None`; nothing is changed in
    /// that case. Otherwise as [`Pool::submit`].
    pub fn execute(&self, task: Option<Job>) -> Result<(), PoolError> {
        self.route(task, None)
    }

    /// Submit an optional boxed task with a bound on the backpressure wait.
    ///
    /// # Errors
    ///
    /// As [`Pool::execute`] and [`Pool::submit_timeout`].
    pub fn execute_timeout(&self, task: Option<Job>, timeout: Duration) -> Result<(), PoolError> {
        self.route(task, Some(timeout))
    }

    fn route(&self, task: Option<Job>, timeout: Option<Duration>) -> Result<(), PoolError> {
        let job = task.ok_or(PoolError::InvalidTask)?;
        let task_tx = self.sender()?;
        let shared = &self.shared;

        let live = shared.registry.len();
        // An empty pool always gets a worker, or queued tasks would never run.
        if live < shared.min_workers || live == 0 {
            debug!(live, route = "spawn_min", "Routing task");
            return self.spawn_worker(job);
        }

        if task_tx.len() < shared.queue_capacity {
            debug!(live, queued = task_tx.len(), route = "enqueue", "Routing task");
            return self.enqueue(&task_tx, job, timeout);
        }

        if shared.registry.len() < shared.config.max_workers {
            debug!(live, route = "spawn_burst", "Routing task");
            return self.spawn_worker(job);
        }

        warn!(
            live,
            max_workers = shared.config.max_workers,
            "Queue full at max workers, submitter blocking"
        );
        self.enqueue(&task_tx, job, timeout)
    }

    fn sender(&self) -> Result<Sender<Job>, PoolError> {
        self.task_tx.read().clone().ok_or(PoolError::Disconnected)
    }

    fn enqueue(
        &self,
        task_tx: &Sender<Job>,
        job: Job,
        timeout: Option<Duration>,
    ) -> Result<(), PoolError> {
        match timeout {
            None => task_tx.send(job).map_err(|_| PoolError::Disconnected)?,
            Some(timeout) => task_tx.send_timeout(job, timeout).map_err(|e| match e {
                SendTimeoutError::Timeout(_) => PoolError::SubmitTimeout,
                SendTimeoutError::Disconnected(_) => PoolError::Disconnected,
            })?,
        }
        self.shared.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        self.rescue_stranded()
    }

    /// Start a worker for a queued task if the last worker left meanwhile.
    fn rescue_stranded(&self) -> Result<(), PoolError> {
        atomic::fence(Ordering::SeqCst);
        if !self.shared.registry.is_empty() {
            return Ok(());
        }
        match self.shared.task_rx.try_recv() {
            Ok(job) => {
                debug!(route = "rescue", "Queued task found with no live worker");
                self.start_worker(job)
            }
            Err(_) => Ok(()),
        }
    }

    fn spawn_worker(&self, job: Job) -> Result<(), PoolError> {
        self.start_worker(job)?;
        self.shared.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn start_worker(&self, job: Job) -> Result<(), PoolError> {
        let shared = &self.shared;
        let id = shared.registry.next_id();
        // Register before the thread exists so a fast task cannot deregister first.
        shared.registry.register(id);

        let worker = Worker::new(id, Arc::clone(shared), job);
        let mut builder = thread::Builder::new().name(format!("elastic-worker-{}", id.0));
        if let Some(size) = shared.config.thread_stack_size {
            builder = builder.stack_size(size);
        }

        match builder.spawn(move || {
            worker.run();
        }) {
            Ok(_) => {
                shared.counters.spawned_workers.fetch_add(1, Ordering::Relaxed);
                debug!(worker = %id, live = shared.registry.len(), "Worker spawned");
                Ok(())
            }
            Err(e) => {
                shared.deregister(id);
                warn!(worker = %id, error = %e, "Failed to spawn worker thread");
                Err(PoolError::WorkerSpawn(e.to_string()))
            }
        }
    }

    /// Number of live workers.
    pub fn live_workers(&self) -> usize {
        self.shared.registry.len()
    }

    /// Identifiers of live workers.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.shared.registry.snapshot()
    }

    /// Number of tasks waiting in the queue.
    pub fn queued_tasks(&self) -> usize {
        self.shared.task_rx.len()
    }

    /// Resolved minimum worker count.
    pub fn min_workers(&self) -> usize {
        self.shared.min_workers
    }

    /// Maximum worker count.
    pub fn max_workers(&self) -> usize {
        self.shared.config.max_workers
    }

    /// Effective idle timeout after clamping.
    pub fn idle_timeout(&self) -> Duration {
        self.shared.config.idle_timeout
    }

    /// Queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.shared.queue_capacity
    }

    /// Eviction policy in use.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.shared.config.eviction
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let shared = &self.shared;
        let counters = &shared.counters;
        PoolStats {
            live_workers: shared.registry.len(),
            queued_tasks: shared.task_rx.len(),
            submitted_tasks: counters.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: counters.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: counters.failed_tasks.load(Ordering::Relaxed),
            spawned_workers: counters.spawned_workers.load(Ordering::Relaxed),
            evicted_workers: counters.evicted_workers.load(Ordering::Relaxed),
            min_workers: shared.min_workers,
            max_workers: shared.config.max_workers,
            queue_capacity: shared.queue_capacity,
        }
    }

    /// Close the queue and wait up to `timeout` for every worker to exit.
    ///
    /// Queued tasks still run. Returns `true` if the registry emptied in time.
    /// Later submissions fail with `PoolError::Disconnected`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if self.task_tx.write().take().is_some() {
            info!(live = self.live_workers(), "Shutting down elastic pool");
        }

        let (lock, cvar) = &self.shared.drained;
        let mut guard = lock.lock();
        let registry = &self.shared.registry;
        let result = cvar.wait_while_for(&mut guard, |_| !registry.is_empty(), timeout);
        let drained = !result.timed_out() || registry.is_empty();
        if drained {
            info!("Elastic pool shut down complete");
        } else {
            warn!(live = registry.len(), "Workers still running after shutdown timeout");
        }
        drained
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Workers drain the queue and exit on their own; nothing is joined here.
        if self.task_tx.get_mut().take().is_some() {
            debug!(live = self.live_workers(), "Elastic pool dropped, closing queue");
        }
    }
}
