//! Builder that combines a [`PoolConfig`] with non-serializable extras.

use std::sync::Arc;

use crate::config::PoolConfig;
use crate::core::{FailureHandler, Pool, PoolError};

/// Builds a [`Pool`] from configuration plus an optional failure handler.
#[must_use]
pub struct PoolBuilder {
    config: PoolConfig,
    failure_handler: Option<Arc<dyn FailureHandler>>,
}

impl PoolBuilder {
    /// Start from a configuration.
    pub const fn new(config: PoolConfig) -> Self {
        Self {
            config,
            failure_handler: None,
        }
    }

    /// Access the configuration as given (before normalization).
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Deliver panics caught in tasks to `handler`.
    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = Some(handler);
        self
    }

    /// Validate the configuration and create the pool. No worker starts until
    /// the first submission.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if validation fails.
    pub fn build(self) -> Result<Pool, PoolError> {
        self.config.validate().map_err(PoolError::InvalidConfig)?;
        Ok(Pool::from_parts(self.config, self.failure_handler))
    }
}
