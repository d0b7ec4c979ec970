//! Waiting out delayed retries.

use crate::strategy::ContinuationContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Source of the current time in epoch millis.
pub trait Clock: Send + Sync {
    /// Now.
    fn now_epoch_ms(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> u64 {
        taskmill_core::now_epoch_millis()
    }
}

/// Decides when a delayed retry may run.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Return no earlier than `scheduled_time` (epoch millis). The retry of
    /// step `key` runs with `ctx` once this returns.
    async fn wait_until(&self, key: &str, ctx: ContinuationContext, scheduled_time: u64);
}

/// Sleeps on the tokio timer.
#[derive(Clone)]
pub struct TokioScheduler {
    clock: Arc<dyn Clock>,
}

impl TokioScheduler {
    /// Measure delays against the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Measure delays against `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn wait_until(&self, key: &str, ctx: ContinuationContext, scheduled_time: u64) {
        let delay = scheduled_time.saturating_sub(self.clock.now_epoch_ms());
        debug!("Retry {} of {} in {}ms", ctx.attempts, key, delay);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

/// One delayed retry seen by a [`RecordingScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    /// Step key
    pub key: String,
    /// Context the retry runs with
    pub ctx: ContinuationContext,
    /// Earliest run time (epoch millis)
    pub scheduled_time: u64,
}

/// Records every schedule, then waits like its inner scheduler.
pub struct RecordingScheduler {
    inner: Arc<dyn Scheduler>,
    schedules: Mutex<Vec<Scheduled>>,
}

impl RecordingScheduler {
    /// Record, then wait with `inner`.
    pub fn new(inner: Arc<dyn Scheduler>) -> Self {
        Self {
            inner,
            schedules: Mutex::new(Vec::new()),
        }
    }

    /// Everything scheduled so far, oldest first.
    pub async fn schedules(&self) -> Vec<Scheduled> {
        self.schedules.lock().await.clone()
    }
}

impl Default for RecordingScheduler {
    fn default() -> Self {
        Self::new(Arc::new(TokioScheduler::new()))
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn wait_until(&self, key: &str, ctx: ContinuationContext, scheduled_time: u64) {
        self.schedules.lock().await.push(Scheduled {
            key: key.to_string(),
            ctx,
            scheduled_time,
        });
        self.inner.wait_until(key, ctx, scheduled_time).await;
    }
}
