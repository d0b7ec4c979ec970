//! Retry decisions for failed blocks.

use crate::scheduler::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// State handed to each invocation of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContinuationContext {
    /// Retries so far. Zero on the first invocation.
    pub attempts: u32,
}

impl ContinuationContext {
    /// The context for a first invocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The context for the next retry.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
        }
    }
}

/// What to do after a block fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Invoke again straight away
    ImmediateRetry(ContinuationContext),
    /// Give up and return the failure
    DontRetry(ContinuationContext),
    /// Invoke again no earlier than the given time (epoch millis)
    DelayedRetry(ContinuationContext, u64),
}

impl RetryStrategy {
    /// The context for the next invocation.
    pub fn new_context(&self) -> ContinuationContext {
        match self {
            RetryStrategy::ImmediateRetry(ctx) | RetryStrategy::DontRetry(ctx) | RetryStrategy::DelayedRetry(ctx, _) => *ctx,
        }
    }
}

/// Picks a [`RetryStrategy`] for a failure.
pub trait ContinuationExceptionStrategy: Send + Sync {
    /// Decide how to continue after `error` on the invocation that saw `ctx`.
    fn handle(&self, ctx: ContinuationContext, error: &anyhow::Error) -> RetryStrategy;
}

/// Retries forever. Retry `n` is scheduled `n * initial_delay_ms` after the
/// failure, so the delay grows linearly.
pub struct RetryForEverExceptionStrategy {
    initial_delay_ms: u64,
    clock: Arc<dyn Clock>,
}

impl RetryForEverExceptionStrategy {
    /// Retry with the given delay unit.
    pub fn new(initial_delay_ms: u64) -> Self {
        Self {
            initial_delay_ms,
            clock: Arc::new(SystemClock),
        }
    }

    /// Read the time from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for RetryForEverExceptionStrategy {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ContinuationExceptionStrategy for RetryForEverExceptionStrategy {
    fn handle(&self, ctx: ContinuationContext, _error: &anyhow::Error) -> RetryStrategy {
        let delay = u64::from(ctx.attempts).saturating_mul(self.initial_delay_ms);
        let scheduled_time = self.clock.now_epoch_ms().saturating_add(delay);
        RetryStrategy::DelayedRetry(ctx.next_attempt(), scheduled_time)
    }
}

/// Always retries straight away.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateRetryStrategy;

impl ContinuationExceptionStrategy for ImmediateRetryStrategy {
    fn handle(&self, ctx: ContinuationContext, _error: &anyhow::Error) -> RetryStrategy {
        RetryStrategy::ImmediateRetry(ctx.next_attempt())
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryStrategy;

impl ContinuationExceptionStrategy for NoRetryStrategy {
    fn handle(&self, ctx: ContinuationContext, _error: &anyhow::Error) -> RetryStrategy {
        RetryStrategy::DontRetry(ctx)
    }
}

/// Caps another strategy at `max_attempts` invocations in total.
pub struct LimitedRetryStrategy {
    inner: Arc<dyn ContinuationExceptionStrategy>,
    max_attempts: u32,
}

impl LimitedRetryStrategy {
    /// Defer to `inner` until `max_attempts` invocations have failed.
    pub fn new(inner: Arc<dyn ContinuationExceptionStrategy>, max_attempts: u32) -> Self {
        Self { inner, max_attempts }
    }
}

impl ContinuationExceptionStrategy for LimitedRetryStrategy {
    fn handle(&self, ctx: ContinuationContext, error: &anyhow::Error) -> RetryStrategy {
        if ctx.attempts + 1 >= self.max_attempts {
            RetryStrategy::DontRetry(ctx)
        } else {
            self.inner.handle(ctx, error)
        }
    }
}
