//! Re-resolvable addresses for logging channels.
//!
//! Tasks may outlive the request that started them, so the server side keeps
//! a locator string with the request and rebuilds the consumer from it. The
//! first part of the string names the channel type, the rest is a channel id.
//! Credentials are never part of a locator.

use crate::consumer::{ConsoleLoggingConsumerContext, InMemoryLogging, LoggingConsumerContext, LoggingReaderContext};
use crate::producer::{LoggingProducerContext, LoggingProducerToConsumer};
use crate::{lock, LoggingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use taskmill_core::booking_reference;

const IN_MEMORY_SCHEME: &str = "INMEMORY";
const CONSOLE_SCHEME: &str = "CONSOLE";

/// Address of a logging channel, e.g. `INMEMORY;BZ13FG` or `CONSOLE;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggingChannelLocator(String);

impl LoggingChannelLocator {
    /// Wrap a raw locator string.
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// A fresh in-memory channel.
    pub fn in_memory() -> Self {
        Self(format!("{IN_MEMORY_SCHEME};{}", booking_reference(6)))
    }

    /// The console channel.
    pub fn console() -> Self {
        Self(format!("{CONSOLE_SCHEME};"))
    }

    /// The raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn in_memory_id(&self) -> Option<&str> {
        self.0.strip_prefix(IN_MEMORY_SCHEME)?.strip_prefix(';')
    }
}

impl std::fmt::Display for LoggingChannelLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// In-memory logging channels keyed by channel id.
///
/// Pass one repo to every factory that should see the same channels.
#[derive(Default)]
pub struct InMemoryLoggingRepo {
    channels: Mutex<HashMap<String, Arc<InMemoryLogging>>>,
}

impl InMemoryLoggingRepo {
    /// Create an empty repo.
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel for `channel_id`, created on first use.
    pub fn lookup(&self, channel_id: &str) -> Arc<InMemoryLogging> {
        lock(&self.channels)
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(InMemoryLogging::new()))
            .clone()
    }
}

/// Resolves logging locators into consumers and readers.
pub struct DefaultLoggingChannelFactory {
    repo: Arc<InMemoryLoggingRepo>,
    console: Arc<ConsoleLoggingConsumerContext>,
}

impl DefaultLoggingChannelFactory {
    /// Create a factory over `repo`.
    pub fn new(repo: Arc<InMemoryLoggingRepo>) -> Self {
        Self {
            repo,
            console: Arc::new(ConsoleLoggingConsumerContext::new()),
        }
    }

    /// The consumer behind `locator`.
    pub fn consumer(&self, locator: &LoggingChannelLocator) -> Result<Arc<dyn LoggingConsumerContext>> {
        if let Some(id) = locator.in_memory_id() {
            return Ok(self.repo.lookup(id));
        }
        if locator.as_str() == format!("{CONSOLE_SCHEME};") {
            return Ok(self.console.clone());
        }
        Err(LoggingError::UnknownLocator(locator.to_string()))
    }

    /// A reader over `locator`. Only in-memory channels can be read back.
    pub fn query(&self, locator: &LoggingChannelLocator) -> Result<Arc<dyn LoggingReaderContext>> {
        match locator.in_memory_id() {
            Some(id) => Ok(self.repo.lookup(id)),
            None => Err(LoggingError::UnknownLocator(locator.to_string())),
        }
    }

    /// A producer writing into the consumer behind `locator`.
    pub fn producer(&self, locator: &LoggingChannelLocator) -> Result<Arc<dyn LoggingProducerContext>> {
        let consumer = self.consumer(locator)?;
        Ok(Arc::new(LoggingProducerToConsumer::new(consumer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_in_memory_locator_round_trip() {
        let repo = Arc::new(InMemoryLoggingRepo::new());
        let producer_side = DefaultLoggingChannelFactory::new(repo.clone());
        let reader_side = DefaultLoggingChannelFactory::new(repo);

        let locator = LoggingChannelLocator::in_memory();
        let relocated = LoggingChannelLocator::new(locator.to_string());

        let producer = producer_side.producer(&locator).unwrap();
        writeln!(producer.stdout(), "from the task").unwrap();

        let reader = reader_side.query(&relocated).unwrap();
        assert_eq!(reader.stdout(), "from the task\n");
    }

    #[test]
    fn test_console_has_no_reader() {
        let factory = DefaultLoggingChannelFactory::new(Arc::new(InMemoryLoggingRepo::new()));
        assert!(factory.consumer(&LoggingChannelLocator::console()).is_ok());
        assert!(matches!(
            factory.query(&LoggingChannelLocator::console()),
            Err(LoggingError::UnknownLocator(_))
        ));
    }

    #[test]
    fn test_unknown_scheme() {
        let factory = DefaultLoggingChannelFactory::new(Arc::new(InMemoryLoggingRepo::new()));
        let result = factory.consumer(&LoggingChannelLocator::new("KAFKA;topic"));
        assert!(matches!(result, Err(LoggingError::UnknownLocator(l)) if l == "KAFKA;topic"));
    }
}
