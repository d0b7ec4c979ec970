//! Logging split for tasks.
//!
//! A task writes through a [`LoggingProducerContext`] (log messages, stdout,
//! stderr). Whoever collects the output implements
//! [`LoggingConsumerContext`]. The two are connected by an adapter, which for
//! local use is [`LoggingProducerToConsumer`]; the boundary is kept narrow so
//! producer and consumer can live on different sides of a process boundary
//! without changing task code.

#![warn(missing_docs)]

pub mod capture;
pub mod channel;
pub mod consumer;
pub mod format;
pub mod producer;

pub use capture::{OutputKind, OutputStream};
pub use channel::{DefaultLoggingChannelFactory, InMemoryLoggingRepo, LoggingChannelLocator};
pub use consumer::{
    ConsoleLoggingConsumerContext, InMemoryLogging, LoggingConsumerContext, LoggingReaderContext,
    TracingLogMessageConsumer,
};
pub use format::{DefaultStringLogFormatter, LogFormat, StringLogFormatter};
pub use producer::{LogMessageConsumer, LoggingProducerContext, LoggingProducerToConsumer};

/// Error type for logging channel lookups.
pub type Result<T> = std::result::Result<T, LoggingError>;

/// Errors that can occur while resolving logging channels.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The locator scheme is not recognized
    #[error("don't know about logging locator `{0}`")]
    UnknownLocator(String),
}

pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
