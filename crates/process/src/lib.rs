//! OS process lifecycle for tasks that run external programs.
//!
//! A [`ProcessManager`] starts processes, captures their stdout and stderr
//! line by line, records how they exited and kills them on request.

#![warn(missing_docs)]

pub mod command;
pub mod manager;
mod monitor;

pub use command::ProcessCommand;
pub use manager::{CapturedOutput, ProcessInfo, ProcessManager, ProcessStatus};

/// Error type for process operations.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Errors from the process manager.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The process could not be started
    #[error("process error: {0}")]
    Io(#[from] std::io::Error),

    /// No process with that id or label
    #[error("no process `{0}`")]
    NotFound(String),

    /// The id is already in use
    #[error("a process with id {0} is already registered")]
    DuplicateId(taskmill_core::UniqueId),
}
