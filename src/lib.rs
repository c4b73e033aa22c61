//! # Elastic Pool
//!
//! A worker thread pool that grows and shrinks between a configured minimum and
//! maximum in response to load.
//!
//! Callers hand the pool zero-argument closures. The pool decides on each
//! submission whether to start a worker for the task, buffer it in a bounded
//! queue, or make the caller wait. Workers that find nothing to do for longer
//! than the idle timeout leave the pool, down to the minimum.
//!
//! ## Sizing Policy
//!
//! - **Minimum staffing first**: below `min_workers`, every submission starts a
//!   worker that runs the task directly.
//! - **Buffer next**: once staffed, tasks go to a queue of
//!   [`config::DEFAULT_QUEUE_CAPACITY`] slots.
//! - **Grow on bursts**: a full queue starts extra workers up to `max_workers`.
//! - **Backpressure last**: a full queue at `max_workers` blocks the caller
//!   (or times out with [`Pool::submit_timeout`]).
//!
//! The pool is fire-and-forget: no results, no cancellation, no priorities,
//! nothing persisted.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use elastic_pool::Pool;
//!
//! let pool = Pool::new(2, 4, Duration::from_secs(3));
//! for i in 0..10 {
//!     pool.submit(move || println!("task {i}")).expect("submit");
//! }
//! pool.shutdown(Duration::from_secs(5));
//! ```
//!
//! Panics inside tasks are caught at the worker and reported through an
//! optional [`FailureHandler`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use elastic_pool::{config::PoolConfig, InMemoryFailureSink, Pool};
//!
//! let sink = Arc::new(InMemoryFailureSink::new(100));
//! let pool = Pool::builder(PoolConfig::new().with_min_workers(1).with_max_workers(8))
//!     .with_failure_handler(sink.clone())
//!     .build()
//!     .expect("valid config");
//! pool.submit(|| panic!("oops")).expect("submit");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Pool orchestration, workers and the live-worker registry.
pub mod core;
/// Configuration models and normalization rules.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Runtime adapters for async callers.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::PoolBuilder;
pub use crate::config::{EvictionPolicy, PoolConfig};
pub use crate::core::{
    FailureHandler, InMemoryFailureSink, Job, Pool, PoolError, PoolStats, TaskFailure, WorkerId,
};
