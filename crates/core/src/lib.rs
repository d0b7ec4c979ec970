//! taskmill core data models.
//!
//! Identities, terminal results, provisioning state and log messages shared
//! by every other taskmill crate.

#![warn(missing_docs)]

// Identities
mod id;

// Results and state carried between tasks
mod result;
mod provisioning;

// Logging atoms
mod log_message;

// Re-exports
pub use id::*;
pub use result::AsyncResult;
pub use provisioning::{ProvisioningState, StageOutputs};
pub use log_message::{LogLevel, LogMessage};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Milliseconds since the Unix epoch for a timestamp.
pub fn epoch_millis(time: Time) -> u64 {
    time.timestamp_millis().max(0) as u64
}

/// Milliseconds since the Unix epoch, now.
pub fn now_epoch_millis() -> u64 {
    epoch_millis(chrono::Utc::now())
}
