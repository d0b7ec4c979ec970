//! Producer side of the logging split - what a task writes to.

use crate::capture::{OutputKind, OutputStream};
use crate::consumer::LoggingConsumerContext;
use std::sync::Arc;
use taskmill_core::LogMessage;

/// Something that accepts log messages.
pub trait LogMessageConsumer: Send + Sync {
    /// Accept one message.
    fn accept(&self, msg: LogMessage);
}

/// The logging handle a task receives through its execution context.
pub trait LoggingProducerContext: Send + Sync {
    /// Write a fully constructed log message.
    fn log(&self, msg: LogMessage);

    /// The task's stdout.
    fn stdout(&self) -> OutputStream;

    /// The task's stderr.
    fn stderr(&self) -> OutputStream;
}

/// Links a producer directly to a consumer in the same process.
///
/// Each `stdout()`/`stderr()` call hands out a fresh stream with its own line
/// buffer.
pub struct LoggingProducerToConsumer {
    consumer: Arc<dyn LoggingConsumerContext>,
}

impl LoggingProducerToConsumer {
    /// Connect to `consumer`.
    pub fn new(consumer: Arc<dyn LoggingConsumerContext>) -> Self {
        Self { consumer }
    }

    /// The connected consumer.
    pub fn consumer(&self) -> &Arc<dyn LoggingConsumerContext> {
        &self.consumer
    }
}

impl LoggingProducerContext for LoggingProducerToConsumer {
    fn log(&self, msg: LogMessage) {
        self.consumer.accept_log(msg);
    }

    fn stdout(&self) -> OutputStream {
        OutputStream::new(self.consumer.clone(), OutputKind::Stdout)
    }

    fn stderr(&self) -> OutputStream {
        OutputStream::new(self.consumer.clone(), OutputKind::Stderr)
    }
}

impl LogMessageConsumer for LoggingProducerToConsumer {
    fn accept(&self, msg: LogMessage) {
        self.consumer.accept_log(msg);
    }
}
