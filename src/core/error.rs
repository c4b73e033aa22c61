//! Error types for pool operations.

use thiserror::Error;

/// Errors produced by the elastic pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Submission carried no task.
    #[error("invalid task")]
    InvalidTask,
    /// No work arrived within the idle timeout and the worker may leave.
    /// Internal signal between the pool and its workers.
    #[error("no work available")]
    NoWork,
    /// The queue stayed full for the whole submission deadline.
    #[error("submission timed out")]
    SubmitTimeout,
    /// The task queue has been closed by shutdown.
    #[error("task queue disconnected")]
    Disconnected,
    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Internal error (blocking submit task panicked or was cancelled).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
