//! Consumer (client) side of the logging split.

use crate::format::{DefaultStringLogFormatter, LogFormat, StringLogFormatter};
use crate::lock;
use crate::producer::LogMessageConsumer;
use std::sync::Mutex;
use taskmill_core::{LogLevel, LogMessage};

/// Receives everything a task produced.
///
/// The link from producer to consumer is assumed to be as timely as
/// reasonably possible. Logging is a side channel, so none of these methods
/// can fail.
pub trait LoggingConsumerContext: Send + Sync {
    /// A structured log message.
    fn accept_log(&self, msg: LogMessage);

    /// One complete line written to stdout (without the newline).
    fn accept_stdout(&self, line: &str);

    /// One complete line written to stderr (without the newline).
    fn accept_stderr(&self, line: &str);
}

/// Read back what a consumer collected.
pub trait LoggingReaderContext: Send + Sync {
    /// Captured stdout, one `\n` terminated line per accepted line.
    fn stdout(&self) -> String;

    /// Captured stderr, one `\n` terminated line per accepted line.
    fn stderr(&self) -> String;

    /// Log messages in arrival order.
    fn messages(&self) -> Vec<LogMessage>;
}

#[derive(Debug, Default)]
struct Captured {
    stdout: String,
    stderr: String,
    messages: Vec<LogMessage>,
}

/// Keeps everything in memory. Mainly for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryLogging {
    captured: Mutex<Captured>,
}

impl InMemoryLogging {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggingConsumerContext for InMemoryLogging {
    fn accept_log(&self, msg: LogMessage) {
        lock(&self.captured).messages.push(msg);
    }

    fn accept_stdout(&self, line: &str) {
        let mut captured = lock(&self.captured);
        captured.stdout.push_str(line);
        captured.stdout.push('\n');
    }

    fn accept_stderr(&self, line: &str) {
        let mut captured = lock(&self.captured);
        captured.stderr.push_str(line);
        captured.stderr.push('\n');
    }
}

impl LoggingReaderContext for InMemoryLogging {
    fn stdout(&self) -> String {
        lock(&self.captured).stdout.clone()
    }

    fn stderr(&self) -> String {
        lock(&self.captured).stderr.clone()
    }

    fn messages(&self) -> Vec<LogMessage> {
        lock(&self.captured).messages.clone()
    }
}

/// Log messages become `tracing` events; output lines go to the process
/// stdout/stderr.
pub struct ConsoleLoggingConsumerContext {
    messages: TracingLogMessageConsumer,
}

impl ConsoleLoggingConsumerContext {
    /// Create with the default formatter and the simple format.
    pub fn new() -> Self {
        Self {
            messages: TracingLogMessageConsumer::new(),
        }
    }

    /// Create with an explicit format.
    pub fn with_format(format: LogFormat) -> Self {
        Self {
            messages: TracingLogMessageConsumer::new().with_format(format),
        }
    }
}

impl Default for ConsoleLoggingConsumerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingConsumerContext for ConsoleLoggingConsumerContext {
    fn accept_log(&self, msg: LogMessage) {
        self.messages.accept(msg);
    }

    fn accept_stdout(&self, line: &str) {
        println!("{line}");
    }

    fn accept_stderr(&self, line: &str) {
        eprintln!("{line}");
    }
}

/// Forwards log messages to `tracing` at the matching level.
pub struct TracingLogMessageConsumer {
    formatter: Box<dyn StringLogFormatter>,
    format: LogFormat,
}

impl TracingLogMessageConsumer {
    /// Create with the default formatter and the simple format.
    pub fn new() -> Self {
        Self {
            formatter: Box::new(DefaultStringLogFormatter),
            format: LogFormat::Simple,
        }
    }

    /// Set the format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the formatter.
    pub fn with_formatter(mut self, formatter: Box<dyn StringLogFormatter>) -> Self {
        self.formatter = formatter;
        self
    }
}

impl Default for TracingLogMessageConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogMessageConsumer for TracingLogMessageConsumer {
    fn accept(&self, msg: LogMessage) {
        let text = self.formatter.format(&msg, self.format);
        let execution_id = msg.execution_id.as_str();
        match msg.level {
            LogLevel::Debug => tracing::debug!(execution_id, "{}", text),
            LogLevel::Info => tracing::info!(execution_id, "{}", text),
            LogLevel::Warn => tracing::warn!(execution_id, "{}", text),
            LogLevel::Error => tracing::error!(execution_id, "{}", text),
        }
    }
}
