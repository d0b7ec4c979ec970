//! Resolves locators into concrete channels.

use crate::locator::AsyncResultChannelSinkLocator;
use crate::memory::InMemoryAsyncResultChannel;
use crate::sink::{AsyncResultChannelQuery, AsyncResultChannelSink};
use crate::{ChannelError, Result};
use std::sync::Arc;

/// Turns a locator into a sink.
pub trait AsyncResultChannelSinkFactory: Send + Sync {
    /// The sink addressed by `locator`.
    fn create(&self, locator: &AsyncResultChannelSinkLocator) -> Result<Arc<dyn AsyncResultChannelSink>>;
}

/// Knows the `LOCAL` scheme only.
///
/// The local channel is handed in at construction, so two factories built
/// over the same channel see the same results and two built over different
/// channels never do.
#[derive(Debug, Clone)]
pub struct DefaultAsyncResultChannelSinkFactory {
    local: Arc<InMemoryAsyncResultChannel>,
}

impl DefaultAsyncResultChannelSinkFactory {
    /// Create a factory resolving `LOCAL` to `local`.
    pub fn new(local: Arc<InMemoryAsyncResultChannel>) -> Self {
        Self { local }
    }

    /// The read side for `locator`.
    pub fn channel_query(&self, locator: &AsyncResultChannelSinkLocator) -> Result<Arc<dyn AsyncResultChannelQuery>> {
        if locator.is_local() {
            Ok(self.local.clone())
        } else {
            Err(ChannelError::UnknownLocator(locator.to_string()))
        }
    }

    /// The in-process channel.
    pub fn local(&self) -> &Arc<InMemoryAsyncResultChannel> {
        &self.local
    }
}

impl Default for DefaultAsyncResultChannelSinkFactory {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryAsyncResultChannel::new()))
    }
}

impl AsyncResultChannelSinkFactory for DefaultAsyncResultChannelSinkFactory {
    fn create(&self, locator: &AsyncResultChannelSinkLocator) -> Result<Arc<dyn AsyncResultChannelSink>> {
        if locator.is_local() {
            Ok(self.local.clone())
        } else {
            Err(ChannelError::UnknownLocator(locator.to_string()))
        }
    }
}
