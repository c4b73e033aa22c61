//! Submission from async code.
//!
//! `Pool::submit` can park the caller under backpressure. These helpers move
//! the call onto tokio's blocking pool so a runtime worker is never parked.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{Pool, PoolError};

/// Submit `task` from an async context.
///
/// # Errors
///
/// As [`Pool::submit`], or `PoolError::Internal` if the blocking call was
/// cancelled or panicked.
pub async fn submit_async<F>(pool: &Arc<Pool>, task: F) -> Result<(), PoolError>
where
    F: FnOnce() + Send + 'static,
{
    let pool = Arc::clone(pool);
    tokio::task::spawn_blocking(move || pool.submit(task))
        .await
        .map_err(|e| PoolError::Internal(e.to_string()))?
}

/// Submit `task` from an async context, waiting at most `timeout` for space.
///
/// # Errors
///
/// As [`Pool::submit_timeout`], or `PoolError::Internal` if the blocking call
/// was cancelled or panicked.
pub async fn submit_timeout_async<F>(
    pool: &Arc<Pool>,
    task: F,
    timeout: Duration,
) -> Result<(), PoolError>
where
    F: FnOnce() + Send + 'static,
{
    let pool = Arc::clone(pool);
    tokio::task::spawn_blocking(move || pool.submit_timeout(task, timeout))
        .await
        .map_err(|e| PoolError::Internal(e.to_string()))?
}
