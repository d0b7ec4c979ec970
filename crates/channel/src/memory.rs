//! In-memory result channel.

use crate::message::AsyncResultChannelMessage;
use crate::sink::{AsyncResultChannelQuery, AsyncResultChannelSink, Delivery};
use crate::{ChannelError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use taskmill_core::{AsyncResult, UniqueId};

/// A result channel held in process memory.
///
/// Safe for concurrent writers; the first message per channel id wins.
#[derive(Debug, Default)]
pub struct InMemoryAsyncResultChannel {
    results: Mutex<HashMap<UniqueId, AsyncResultChannelMessage>>,
}

impl InMemoryAsyncResultChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resolved channel ids.
    pub async fn len(&self) -> usize {
        self.results.lock().await.len()
    }

    /// Whether nothing has been resolved yet.
    pub async fn is_empty(&self) -> bool {
        self.results.lock().await.is_empty()
    }

    /// The stored message, including its type hint.
    pub async fn message(&self, channel_id: &UniqueId) -> Option<AsyncResultChannelMessage> {
        self.results.lock().await.get(channel_id).cloned()
    }
}

#[async_trait]
impl AsyncResultChannelSink for InMemoryAsyncResultChannel {
    async fn accept(&self, message: AsyncResultChannelMessage) -> Result<Delivery> {
        let mut results = self.results.lock().await;
        if results.contains_key(&message.channel_id) {
            warn!("Ignoring duplicate result for channel {}", message.channel_id);
            return Ok(Delivery::Ignored);
        }
        debug!("Storing result for channel {}", message.channel_id);
        results.insert(message.channel_id.clone(), message);
        Ok(Delivery::Stored)
    }
}

#[async_trait]
impl AsyncResultChannelQuery for InMemoryAsyncResultChannel {
    async fn has_result(&self, channel_id: &UniqueId) -> bool {
        self.results.lock().await.contains_key(channel_id)
    }

    async fn result_value(&self, channel_id: &UniqueId) -> Result<AsyncResult<Value>> {
        self.results
            .lock()
            .await
            .get(channel_id)
            .map(|message| message.result.clone())
            .ok_or_else(|| ChannelError::NoResult(channel_id.clone()))
    }
}
