//! Configuration types for the ingest stage.
//!
//! [`IngestConfig`] bounds what a join request may contain and sizes the
//! intake queue. It is cheap to clone and deserializes from the `ingest:`
//! section of the service YAML.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("defaults are valid");
//! assert_eq!(config.queue_capacity, 100);
//! ```
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime configuration for request validation and queueing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Highest accepted difficulty ordinal. `0` is always accepted as "any".
    ///
    /// Default: `3`
    pub max_difficulty: u32,

    /// Highest accepted desired group size. `0` is always accepted as "any".
    ///
    /// Default: `4`
    pub max_desired_size: u32,

    /// Number of validated profiles the intake queue holds before
    /// submissions start failing with
    /// [`QueueOverflow`](crate::IngestError::QueueOverflow).
    ///
    /// Default: `100`
    pub queue_capacity: usize,

    /// Milliseconds a blocking submission waits for queue space before
    /// giving up.
    ///
    /// Default: `250`
    pub submit_timeout_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_difficulty: 3,
            max_desired_size: 4,
            queue_capacity: 100,
            submit_timeout_ms: 250,
        }
    }
}

impl IngestConfig {
    /// Validate internal consistency. Call once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.max_desired_size == 1 {
            return Err(ConfigError::SingletonGroupSize);
        }
        Ok(())
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

/// Errors produced by [`IngestConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("queue_capacity must be greater than zero")]
    ZeroQueueCapacity,

    /// A maximum desired size of one would admit requests that can never
    /// be satisfied by a group.
    #[error("max_desired_size of 1 cannot form a group")]
    SingletonGroupSize,
}
