//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use taskmill_logging::LogFormat;

/// Errors loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid configuration
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Max concurrently running units of work (None = unbounded)
    pub max_concurrent: Option<NonZeroUsize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: NonZeroUsize::new(8),
        }
    }
}

/// Retry settings for continuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay unit for the n-th retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Give up after this many attempts (None = retry forever)
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_attempts: None,
        }
    }
}

/// How callers poll result channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultPollConfig {
    /// Time between polls, in milliseconds
    pub interval_ms: u64,
    /// Give up after this long, in milliseconds
    pub timeout_ms: u64,
}

impl Default for ResultPollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            timeout_ms: 30_000,
        }
    }
}

impl ResultPollConfig {
    /// Poll interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Poll deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top level configuration for a taskmill runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker pool
    pub executor: ExecutorConfig,
    /// Continuation retries
    pub retry: RetryConfig,
    /// Result polling
    pub result_poll: ResultPollConfig,
    /// Format for console log output
    pub log_format: LogFormat,
}

impl RuntimeConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Set worker pool settings.
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Set retry settings.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set result polling settings.
    pub fn with_result_poll(mut self, result_poll: ResultPollConfig) -> Self {
        self.result_poll = result_poll;
        self
    }

    /// Set the console log format.
    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }
}
