//! Log messages - the atoms every task writes to its logging channel.

use crate::id::UniqueId;
use crate::Time;
use serde::{Deserialize, Serialize};

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Normal progress
    Info,
    /// Something unexpected but recoverable
    Warn,
    /// A failure
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A single log message.
///
/// Every message is linked to an execution id. Related tasks (say TaskA, TaskB
/// and TaskC run in order by a higher level service) share one execution id,
/// much like a trace id in distributed tracing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Execution (trace) this message belongs to
    pub execution_id: UniqueId,

    /// Severity
    pub level: LogLevel,

    /// The text
    pub body: String,

    /// When it was written
    pub timestamp: Time,

    /// The task that wrote it, if known
    pub task_id: Option<UniqueId>,
}

impl LogMessage {
    /// Create a new message stamped with the current time.
    pub fn new(execution_id: UniqueId, level: LogLevel, body: impl Into<String>) -> Self {
        Self {
            execution_id,
            level,
            body: body.into(),
            timestamp: chrono::Utc::now(),
            task_id: None,
        }
    }

    /// Attach the writing task.
    pub fn with_task_id(mut self, task_id: UniqueId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Debug message.
    pub fn debug(body: impl Into<String>, execution_id: UniqueId) -> Self {
        Self::new(execution_id, LogLevel::Debug, body)
    }

    /// Info message.
    pub fn info(body: impl Into<String>, execution_id: UniqueId) -> Self {
        Self::new(execution_id, LogLevel::Info, body)
    }

    /// Warning message.
    pub fn warn(body: impl Into<String>, execution_id: UniqueId) -> Self {
        Self::new(execution_id, LogLevel::Warn, body)
    }

    /// Error message.
    pub fn error(body: impl Into<String>, execution_id: UniqueId) -> Self {
        Self::new(execution_id, LogLevel::Error, body)
    }
}
