//! Task errors.

use crate::factory::FactoryError;
use std::any::Any;
use std::time::Duration;
use taskmill_channel::ChannelError;
use taskmill_process::ProcessError;

/// Result type for task execution.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors raised while creating or running tasks.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task itself failed. Carried verbatim to the caller.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// Result channel error, e.g. an unknown locator
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Task lookup or registration error
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// Process manager error
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Gave up waiting
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Input or output did not match the task's types
    #[error("invalid task payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The work panicked
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// A task failure with a plain message.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        TaskError::Failed(anyhow::anyhow!("{message}"))
    }
}

/// The message carried by a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
