//! Configuration for the dispatch loop and the in-memory queue.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "dispatch": { "poll_interval_ms": 10, "pool_size": 8 },
//!   "queue": { "visibility_timeout_ms": 30000, "max_attempts": 5 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impls::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Period of the dispatch trigger.
    pub poll_interval_ms: u64,

    /// Maximum number of handlers running at once.
    pub pool_size: u32,
}

impl DispatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("dispatch.poll_interval_ms must be > 0".into()));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid("dispatch.pool_size must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            pool_size: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How long a delivered message stays invisible before redelivery.
    pub visibility_timeout_ms: u64,

    /// Deliveries before a message is declared dead.
    pub max_attempts: u32,

    pub retry_base_delay_ms: u64,

    pub retry_multiplier: f64,
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.visibility_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.retry_base_delay_ms),
            self.retry_multiplier,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("queue.max_attempts must be > 0".into()));
        }
        if !self.retry_multiplier.is_finite() || self.retry_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "queue.retry_multiplier must be a finite number >= 1.0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_ms: 30_000,
            max_attempts: 5,
            retry_base_delay_ms: 2_000,
            retry_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpindleConfig {
    pub dispatch: DispatchConfig,
    pub queue: QueueConfig,
}

impl SpindleConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate()?;
        self.queue.validate()
    }
}
