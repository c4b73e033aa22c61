//! Runtime adapters for async callers.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_submit;

#[cfg(feature = "tokio-runtime")]
pub use tokio_submit::{submit_async, submit_timeout_async};
