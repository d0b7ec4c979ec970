//! The return address a producer writes its result to.

use crate::factory::AsyncResultChannelSinkFactory;
use crate::locator::AsyncResultChannelSinkLocator;
use crate::message::AsyncResultChannelMessage;
use crate::sink::Delivery;
use crate::Result;
use serde::{Deserialize, Serialize};
use taskmill_core::UniqueId;

/// Where a result should go: a locator plus a channel id.
///
/// Serializable, so it can be stored with the request that asked for the
/// result and used later, possibly by another process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncResultChannelSource {
    /// Sink address
    pub locator: AsyncResultChannelSinkLocator,
    /// Channel to resolve
    pub channel_id: UniqueId,
}

impl AsyncResultChannelSource {
    /// Create a return address.
    pub fn new(locator: AsyncResultChannelSinkLocator, channel_id: UniqueId) -> Self {
        Self { locator, channel_id }
    }

    /// Resolve the channel with a success value.
    pub async fn success<T: Serialize>(
        &self,
        factory: &dyn AsyncResultChannelSinkFactory,
        value: &T,
    ) -> Result<Delivery> {
        let message = AsyncResultChannelMessage::success(self.channel_id.clone(), value)?;
        self.send(factory, message).await
    }

    /// Resolve the channel as failed.
    pub async fn fail<T>(&self, factory: &dyn AsyncResultChannelSinkFactory, message: impl Into<String>) -> Result<Delivery> {
        let message = AsyncResultChannelMessage::fail::<T>(self.channel_id.clone(), message);
        self.send(factory, message).await
    }

    /// Resolve the channel as timed out.
    pub async fn timeout<T>(
        &self,
        factory: &dyn AsyncResultChannelSinkFactory,
        message: impl Into<String>,
    ) -> Result<Delivery> {
        let message = AsyncResultChannelMessage::timeout::<T>(self.channel_id.clone(), message);
        self.send(factory, message).await
    }

    async fn send(&self, factory: &dyn AsyncResultChannelSinkFactory, message: AsyncResultChannelMessage) -> Result<Delivery> {
        factory.create(&self.locator)?.accept(message).await
    }
}
