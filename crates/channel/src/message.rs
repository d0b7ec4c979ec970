//! The message written to a result channel.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskmill_core::{AsyncResult, UniqueId};

/// One terminal result for one channel id.
///
/// The value travels as JSON so producer and consumer need not share a
/// process; `result_type` is a hint naming the producer's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncResultChannelMessage {
    /// Channel this result resolves
    pub channel_id: UniqueId,

    /// The outcome
    pub result: AsyncResult<Value>,

    /// Type hint for the success value
    pub result_type: String,
}

impl AsyncResultChannelMessage {
    /// Successful result carrying `value`.
    pub fn success<T: Serialize>(channel_id: UniqueId, value: &T) -> Result<Self> {
        Ok(Self {
            channel_id,
            result: AsyncResult::Success(serde_json::to_value(value)?),
            result_type: std::any::type_name::<T>().to_string(),
        })
    }

    /// Failed result.
    pub fn fail<T>(channel_id: UniqueId, message: impl Into<String>) -> Self {
        Self {
            channel_id,
            result: AsyncResult::Fail(message.into()),
            result_type: std::any::type_name::<T>().to_string(),
        }
    }

    /// Timed out result.
    pub fn timeout<T>(channel_id: UniqueId, message: impl Into<String>) -> Self {
        Self {
            channel_id,
            result: AsyncResult::Timeout(message.into()),
            result_type: std::any::type_name::<T>().to_string(),
        }
    }
}
