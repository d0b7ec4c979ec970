//! Polling wait on top of a query.
//!
//! The query itself never blocks. This adapter polls it at a fixed interval
//! and turns a missed deadline into an [`AsyncResult::Timeout`], so callers
//! that do want to wait never wait forever.

use crate::sink::{AsyncResultChannelQuery, AsyncResultChannelQueryExt};
use crate::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use taskmill_core::{AsyncResult, UniqueId};
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for results by polling a query.
#[derive(Clone)]
pub struct ResultWaiter {
    query: Arc<dyn AsyncResultChannelQuery>,
    interval: Duration,
    timeout: Duration,
}

impl ResultWaiter {
    /// Poll `query` every 100ms for up to 30s.
    pub fn new(query: Arc<dyn AsyncResultChannelQuery>) -> Self {
        Self {
            query,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the deadline, measured from the start of each wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for the result of `channel_id`.
    ///
    /// Returns the stored result once there is one, or `Timeout` if the
    /// deadline passes first. Nothing is written to the channel on timeout.
    pub async fn wait_for<T: DeserializeOwned + Send>(&self, channel_id: &UniqueId) -> Result<AsyncResult<T>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.query.has_result(channel_id).await {
                return self.query.result::<T>(channel_id).await;
            }
            if Instant::now() >= deadline {
                debug!("No result for {} after {:?}", channel_id, self.timeout);
                return Ok(AsyncResult::Timeout(format!(
                    "no result for {} within {}ms",
                    channel_id,
                    self.timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl std::fmt::Debug for ResultWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultWaiter")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Wait for `channel_id` on `query` with the given interval and timeout.
pub async fn wait_for_result<T: DeserializeOwned + Send>(
    query: Arc<dyn AsyncResultChannelQuery>,
    channel_id: &UniqueId,
    interval: Duration,
    timeout: Duration,
) -> Result<AsyncResult<T>> {
    ResultWaiter::new(query)
        .with_interval(interval)
        .with_timeout(timeout)
        .wait_for(channel_id)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAsyncResultChannel;
    use crate::message::AsyncResultChannelMessage;
    use crate::sink::AsyncResultChannelSink;

    #[tokio::test(start_paused = true)]
    async fn test_wait_sees_late_result() {
        let channel = Arc::new(InMemoryAsyncResultChannel::new());
        let id = UniqueId::random(6);

        let writer = channel.clone();
        let write_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            writer
                .accept(AsyncResultChannelMessage::success(write_id, &7).unwrap())
                .await
                .unwrap();
        });

        let waiter = ResultWaiter::new(channel).with_timeout(Duration::from_secs(5));
        assert_eq!(waiter.wait_for::<i32>(&id).await.unwrap(), AsyncResult::Success(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let channel = Arc::new(InMemoryAsyncResultChannel::new());
        let id = UniqueId::random(6);

        let result = wait_for_result::<i32>(
            channel.clone(),
            &id,
            Duration::from_millis(50),
            Duration::from_millis(200),
        )
        .await
        .unwrap();

        assert!(matches!(result, AsyncResult::Timeout(_)));
        assert!(!channel.has_result(&id).await);
    }
}
