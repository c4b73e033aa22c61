//! Worker execution loop and lifecycle.
//!
//! A worker is born with a task already attached, runs it, then keeps asking
//! its [`WorkSource`] for more until told there is none. At that point it
//! deregisters itself and its thread returns.
//!
//! ```text
//! Assigned -> Running -> WaitingForWork -> Running -> ... -> Terminated
//! ```

use std::sync::Arc;
use std::thread;

use tracing::{debug, error, trace};

use super::task::run_guarded;
use super::{Job, PoolError, TaskFailure, WorkerId};

/// Where a worker gets its next task and reports back to.
///
/// Implemented by the pool's shared state; tests substitute their own.
pub trait WorkSource: Send + Sync + 'static {
    /// Block until a task is available.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoWork`] when the worker should leave because it
    /// idled out, or [`PoolError::Disconnected`] when the pool is gone.
    fn acquire(&self, id: WorkerId) -> Result<Job, PoolError>;

    /// Remove the worker from the pool's registry. Must be idempotent.
    fn deregister(&self, id: WorkerId);

    /// Called once per finished task, with the failure if the task panicked.
    fn task_finished(&self, failure: Option<TaskFailure>);
}

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Spawned with an initial task that has not started yet.
    Assigned,
    /// Holding a task that is about to run or running.
    Running,
    /// Finished a task, about to ask for the next one.
    WaitingForWork,
    /// Deregistered; no further transitions.
    Terminated,
}

/// An execution unit bound to one thread.
pub struct Worker<S: WorkSource> {
    id: WorkerId,
    source: Arc<S>,
    current: Option<Job>,
    state: WorkerState,
    tasks_run: u64,
}

impl<S: WorkSource> Worker<S> {
    /// Create a worker holding its first task.
    pub fn new(id: WorkerId, source: Arc<S>, task: Job) -> Self {
        Self {
            id,
            source,
            current: Some(task),
            state: WorkerState::Assigned,
            tasks_run: 0,
        }
    }

    /// Worker identifier.
    pub const fn id(&self) -> WorkerId {
        self.id
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> WorkerState {
        self.state
    }

    /// Number of tasks this worker has finished.
    pub const fn tasks_run(&self) -> u64 {
        self.tasks_run
    }

    /// Advance the state machine by one transition.
    ///
    /// Returns `false` once the worker is terminated.
    pub fn step(&mut self) -> bool {
        match self.state {
            WorkerState::Assigned => self.transition(WorkerState::Running),
            WorkerState::Running => {
                if let Some(job) = self.current.take() {
                    self.execute(job);
                }
                self.transition(WorkerState::WaitingForWork);
            }
            WorkerState::WaitingForWork => match self.source.acquire(self.id) {
                Ok(job) => {
                    self.current = Some(job);
                    self.transition(WorkerState::Running);
                }
                Err(reason) => {
                    debug!(worker = %self.id, %reason, tasks_run = self.tasks_run, "Worker leaving pool");
                    self.source.deregister(self.id);
                    self.transition(WorkerState::Terminated);
                }
            },
            WorkerState::Terminated => return false,
        }
        true
    }

    /// Drive the worker until it terminates. Returns the number of tasks run.
    ///
    /// If anything unwinds out of the loop the worker still deregisters.
    pub fn run(mut self) -> u64 {
        debug!(worker = %self.id, "Worker started");
        let _departure = Departure {
            id: self.id,
            source: Arc::clone(&self.source),
        };
        while self.step() {}
        self.tasks_run
    }

    fn execute(&mut self, job: Job) {
        let failure = run_guarded(job).err().map(|message| {
            error!(worker = %self.id, panic = %message, "Task panicked");
            TaskFailure {
                worker_id: self.id,
                message,
            }
        });
        self.tasks_run += 1;
        self.source.task_finished(failure);
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(worker = %self.id, from = ?self.state, to = ?next, "Worker state change");
        self.state = next;
    }
}

/// Deregisters its worker when dropped during a panic.
struct Departure<S: WorkSource> {
    id: WorkerId,
    source: Arc<S>,
}

impl<S: WorkSource> Drop for Departure<S> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = %self.id, "Worker unwinding, deregistering");
            self.source.deregister(self.id);
        }
    }
}
