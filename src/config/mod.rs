//! Configuration models for elastic pools.

pub mod pool;

pub use pool::{EvictionPolicy, PoolConfig, DEFAULT_QUEUE_CAPACITY, MIN_IDLE_TIMEOUT};
