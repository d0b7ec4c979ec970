//! Resumable multi-step work.
//!
//! A [`Continuation`] runs named steps at most once to success. The first
//! successful result of a step is remembered under its key, so a workflow
//! that is run again after a failure skips the steps it already finished.
//! Failed steps can be retried according to a pluggable
//! [`ContinuationExceptionStrategy`].

#![warn(missing_docs)]

pub mod continuation;
pub mod demo;
pub mod scheduler;
pub mod strategy;

pub use continuation::{Continuation, ContinuationFactory};
pub use scheduler::{Clock, RecordingScheduler, Scheduled, Scheduler, SystemClock, TokioScheduler};
pub use strategy::{
    ContinuationContext, ContinuationExceptionStrategy, ImmediateRetryStrategy, LimitedRetryStrategy,
    NoRetryStrategy, RetryForEverExceptionStrategy, RetryStrategy,
};

/// Result type for continuation operations.
pub type Result<T> = std::result::Result<T, ContinuationError>;

/// Errors from running a step.
#[derive(Debug, thiserror::Error)]
pub enum ContinuationError {
    /// The step failed and will not be retried. This is the step's own error.
    #[error(transparent)]
    Block(anyhow::Error),

    /// The remembered result does not fit the requested type
    #[error("remembered result for step `{key}` has the wrong type: {source}")]
    Decode {
        /// Step key
        key: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The step's result could not be remembered
    #[error("cannot remember result: {0}")]
    Encode(#[from] serde_json::Error),
}
