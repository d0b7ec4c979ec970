//! Line-buffered output streams feeding a logging consumer.

use crate::consumer::LoggingConsumerContext;
use std::io::Write;
use std::sync::Arc;

/// Which stream an [`OutputStream`] feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// An `io::Write` that forwards whole lines to a consumer.
///
/// Bytes are buffered until a newline; each completed line is delivered
/// exactly once, without its newline, in write order. Every handle owns its
/// buffer, so writers on different handles never splice into each other's
/// lines. A clone starts with an empty line, and an unfinished line is
/// delivered when its handle is dropped.
pub struct OutputStream {
    consumer: Arc<dyn LoggingConsumerContext>,
    kind: OutputKind,
    pending: Vec<u8>,
}

impl OutputStream {
    /// Create a stream feeding `consumer`.
    pub fn new(consumer: Arc<dyn LoggingConsumerContext>, kind: OutputKind) -> Self {
        Self {
            consumer,
            kind,
            pending: Vec::new(),
        }
    }

    /// Which stream this is.
    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    fn emit(&self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        match self.kind {
            OutputKind::Stdout => self.consumer.accept_stdout(&line),
            OutputKind::Stderr => self.consumer.accept_stderr(&line),
        }
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.pending);
                self.emit(&line);
            } else {
                self.pending.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Clone for OutputStream {
    fn clone(&self) -> Self {
        Self::new(self.consumer.clone(), self.kind)
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line);
        }
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream").field("kind", &self.kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::{InMemoryLogging, LoggingReaderContext};

    #[test]
    fn test_capture_stdout_lines() {
        let logging = Arc::new(InMemoryLogging::new());
        let mut out = OutputStream::new(logging.clone(), OutputKind::Stdout);

        writeln!(out, "Hello World").unwrap();
        write!(out, "Goodbye, ").unwrap();
        writeln!(out, "cruel World").unwrap();

        assert_eq!(logging.stdout(), "Hello World\nGoodbye, cruel World\n");
        assert_eq!(logging.stderr(), "");
    }

    #[test]
    fn test_capture_stderr_lines() {
        let logging = Arc::new(InMemoryLogging::new());
        let mut err = OutputStream::new(logging.clone(), OutputKind::Stderr);

        writeln!(err, "Opps, it went wrong!").unwrap();

        assert_eq!(logging.stderr(), "Opps, it went wrong!\n");
        assert_eq!(logging.stdout(), "");
    }

    #[test]
    fn test_partial_line_emitted_on_drop() {
        let logging = Arc::new(InMemoryLogging::new());
        let mut out = OutputStream::new(logging.clone(), OutputKind::Stdout);

        write!(out, "no newline yet").unwrap();
        out.flush().unwrap();
        assert_eq!(logging.stdout(), "");

        // a clone has its own line
        let mut other = out.clone();
        writeln!(other, "other").unwrap();
        assert_eq!(logging.stdout(), "other\n");

        drop(out);
        assert_eq!(logging.stdout(), "other\nno newline yet\n");
    }

    #[test]
    fn test_concurrent_writers_keep_whole_lines() {
        let logging = Arc::new(InMemoryLogging::new());
        let out = OutputStream::new(logging.clone(), OutputKind::Stdout);

        let writers: Vec<_> = ["aaaa", "bbbb"]
            .into_iter()
            .map(|text| {
                let mut out = out.clone();
                std::thread::spawn(move || {
                    for _ in 0..5_000 {
                        writeln!(out, "{text}").unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let stdout = logging.stdout();
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 10_000);
        assert!(lines.iter().all(|line| *line == "aaaa" || *line == "bbbb"));
        assert_eq!(lines.iter().filter(|line| **line == "aaaa").count(), 5_000);
    }
}
