//! Pool sizing configuration and normalization rules.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Smallest idle timeout a pool will accept; shorter values are clamped up.
pub const MIN_IDLE_TIMEOUT: Duration = Duration::from_secs(3);

/// Fixed capacity of the pending-task queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

const ENV_MIN_WORKERS: &str = "ELASTIC_POOL_MIN_WORKERS";
const ENV_MAX_WORKERS: &str = "ELASTIC_POOL_MAX_WORKERS";
const ENV_IDLE_TIMEOUT_MS: &str = "ELASTIC_POOL_IDLE_TIMEOUT_MS";
const ENV_EVICTION: &str = "ELASTIC_POOL_EVICTION";

/// How an idle worker decides whether it may leave the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Read the live count, then decide. Several idle workers may observe the
    /// same stale count and all leave, briefly dropping below `min_workers`.
    #[default]
    Approximate,
    /// Claim the departure with a compare-and-swap on the live count. The pool
    /// never evicts below `min_workers`.
    Strict,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approximate" => Ok(Self::Approximate),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown eviction policy `{other}`")),
        }
    }
}

/// Elastic pool configuration.
///
/// Out-of-range values are normalized rather than rejected; see
/// [`PoolConfig::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Workers kept alive regardless of idleness. `None` means one per CPU.
    pub min_workers: Option<usize>,
    /// Upper bound on live workers.
    pub max_workers: usize,
    /// How long a worker waits for work before it may be evicted.
    #[serde(rename = "idle_timeout_ms", with = "duration_ms")]
    pub idle_timeout: Duration,
    /// Eviction decision strategy.
    pub eviction: EvictionPolicy,
    /// Stack size for worker threads; platform default when `None`.
    pub thread_stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: None,
            max_workers: 0,
            idle_timeout: MIN_IDLE_TIMEOUT,
            eviction: EvictionPolicy::default(),
            thread_stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with defaults (CPU-count minimum, clamped idle timeout).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum worker count.
    #[must_use]
    pub const fn with_min_workers(mut self, min: usize) -> Self {
        self.min_workers = Some(min);
        self
    }

    /// Set the maximum worker count.
    #[must_use]
    pub const fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max;
        self
    }

    /// Set the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Set the eviction policy.
    #[must_use]
    pub const fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = Some(size);
        self
    }

    /// Build a configuration from the signed arguments of [`crate::Pool::new`].
    ///
    /// A negative `min` selects the CPU count; a negative `max` is treated as zero
    /// and then raised to `min` by normalization.
    #[must_use]
    pub fn from_bounds(min: isize, max: isize, idle_timeout: Duration) -> Self {
        Self {
            min_workers: usize::try_from(min).ok(),
            max_workers: usize::try_from(max).unwrap_or(0),
            idle_timeout,
            ..Self::default()
        }
    }

    /// Apply the sizing rules: resolve the minimum, raise `max` to `min` (and
    /// to at least one), and clamp the idle timeout to [`MIN_IDLE_TIMEOUT`].
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let min = self.min_workers.unwrap_or_else(num_cpus::get);
        self.min_workers = Some(min);
        self.max_workers = self.max_workers.max(min).max(1);
        self.idle_timeout = self.idle_timeout.max(MIN_IDLE_TIMEOUT);
        self
    }

    /// Resolved minimum worker count.
    #[must_use]
    pub fn resolved_min_workers(&self) -> usize {
        self.min_workers.unwrap_or_else(num_cpus::get)
    }

    /// Validate values that cannot be normalized.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading `.env` first
    /// if one is present. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a key is present but cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when a key is present but cannot be parsed, or when the
    /// resulting configuration fails validation.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_MIN_WORKERS) {
            cfg.min_workers = Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("{ENV_MIN_WORKERS}={raw}"))?,
            );
        }
        if let Some(raw) = lookup(ENV_MAX_WORKERS) {
            cfg.max_workers = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_WORKERS}={raw}"))?;
        }
        if let Some(raw) = lookup(ENV_IDLE_TIMEOUT_MS) {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_IDLE_TIMEOUT_MS}={raw}"))?;
            cfg.idle_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup(ENV_EVICTION) {
            cfg.eviction = raw
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("{ENV_EVICTION}={raw}"))?;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
