//! Pool orchestration, worker lifecycle and the registry they share.

pub mod error;
pub mod pool;
pub mod registry;
pub mod task;
pub mod worker;

pub use error::{AppResult, PoolError};
pub use pool::{Pool, PoolStats};
pub use registry::{Registry, WorkerId};
pub use task::{FailureHandler, InMemoryFailureSink, Job, TaskFailure};
pub use worker::{WorkSource, Worker, WorkerState};
