//! String formats for log messages.

use serde::{Deserialize, Serialize};
use taskmill_core::LogMessage;

/// The fixed set of supported formats. Anything custom is up to the
/// downstream system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// All fields
    Full,
    /// Timestamp excluded and ids masked, stable across test runs
    Test,
    /// Level and body only
    #[default]
    Simple,
}

/// Renders a log message as a string.
pub trait StringLogFormatter: Send + Sync {
    /// Format `msg` in the requested format.
    fn format(&self, msg: &LogMessage, format: LogFormat) -> String;
}

/// Human readable formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStringLogFormatter;

impl StringLogFormatter for DefaultStringLogFormatter {
    fn format(&self, msg: &LogMessage, format: LogFormat) -> String {
        match format {
            LogFormat::Simple => format!("{} {}", msg.level, msg.body),
            LogFormat::Test => {
                let mut out = format!("level={}, message={}", msg.level, msg.body);
                if msg.task_id.is_some() {
                    out.push_str(", taskId=xxxxxx");
                }
                out
            }
            LogFormat::Full => {
                let mut out = format!(
                    "level={}, message={}, executionId={}",
                    msg.level, msg.body, msg.execution_id
                );
                if let Some(task_id) = &msg.task_id {
                    out.push_str(&format!(", taskId={task_id}"));
                }
                out.push_str(&format!(", timestamp={}", msg.timestamp.to_rfc3339()));
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmill_core::UniqueId;

    #[test]
    fn test_simple_format() {
        let msg = LogMessage::info("Calculating square of 10", UniqueId::new());
        assert_eq!(
            DefaultStringLogFormatter.format(&msg, LogFormat::Simple),
            "INFO Calculating square of 10"
        );
    }

    #[test]
    fn test_test_format_masks_task_id() {
        let msg = LogMessage::warn("careful", UniqueId::new()).with_task_id(UniqueId::new());
        assert_eq!(
            DefaultStringLogFormatter.format(&msg, LogFormat::Test),
            "level=WARN, message=careful, taskId=xxxxxx"
        );
    }

    #[test]
    fn test_full_format_has_ids() {
        let execution_id = UniqueId::from_string("exec-0001").unwrap();
        let msg = LogMessage::error("boom", execution_id);
        let text = DefaultStringLogFormatter.format(&msg, LogFormat::Full);
        assert!(text.starts_with("level=ERROR, message=boom, executionId=exec-0001"));
        assert!(text.contains("timestamp="));
        assert!(!text.contains("taskId"));
    }
}
