//! Write and read sides of a result channel.

use crate::message::AsyncResultChannelMessage;
use crate::{ChannelError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskmill_core::{AsyncResult, UniqueId};

/// What happened to an accepted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// First result for the channel, now observable
    Stored,
    /// The channel was already resolved; the earlier result stands
    Ignored,
}

/// The producer (write) side of a result channel.
#[async_trait]
pub trait AsyncResultChannelSink: Send + Sync {
    /// Deliver a result.
    ///
    /// Idempotent: once a channel id is resolved, later messages for it
    /// never change the observable result.
    async fn accept(&self, message: AsyncResultChannelMessage) -> Result<Delivery>;
}

/// The consumer (read) side of a result channel.
///
/// Callers poll; nothing here blocks waiting for a result.
#[async_trait]
pub trait AsyncResultChannelQuery: Send + Sync {
    /// Whether a result has been delivered for `channel_id`.
    async fn has_result(&self, channel_id: &UniqueId) -> bool;

    /// The raw result, or [`ChannelError::NoResult`] if none yet.
    async fn result_value(&self, channel_id: &UniqueId) -> Result<AsyncResult<Value>>;
}

/// Typed reads over any [`AsyncResultChannelQuery`].
#[async_trait]
pub trait AsyncResultChannelQueryExt: AsyncResultChannelQuery {
    /// The result decoded as `T`.
    async fn result<T: DeserializeOwned + Send>(&self, channel_id: &UniqueId) -> Result<AsyncResult<T>> {
        match self.result_value(channel_id).await? {
            AsyncResult::Success(value) => serde_json::from_value(value)
                .map(AsyncResult::Success)
                .map_err(|source| ChannelError::Decode {
                    channel_id: channel_id.clone(),
                    expected: std::any::type_name::<T>(),
                    source,
                }),
            AsyncResult::Fail(message) => Ok(AsyncResult::Fail(message)),
            AsyncResult::Timeout(message) => Ok(AsyncResult::Timeout(message)),
        }
    }
}

impl<Q: AsyncResultChannelQuery + ?Sized> AsyncResultChannelQueryExt for Q {}
