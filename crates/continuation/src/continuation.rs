//! Memoized steps with retries.

use crate::scheduler::{Scheduler, TokioScheduler};
use crate::strategy::{
    ContinuationContext, ContinuationExceptionStrategy, LimitedRetryStrategy, RetryForEverExceptionStrategy,
    RetryStrategy,
};
use crate::{ContinuationError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use taskmill_execution::RetryConfig;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Runs named steps at most once to success.
///
/// Results are remembered in memory as JSON. Calls for the same step key
/// are serialized, so two concurrent callers never both run the step.
pub struct Continuation {
    key: String,
    results: Mutex<HashMap<String, Value>>,
    step_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    strategy: Option<Arc<dyn ContinuationExceptionStrategy>>,
    scheduler: Arc<dyn Scheduler>,
}

impl Continuation {
    /// A continuation without a retry strategy: failures propagate at once.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            results: Mutex::new(HashMap::new()),
            step_locks: Mutex::new(HashMap::new()),
            strategy: None,
            scheduler: Arc::new(TokioScheduler::new()),
        }
    }

    /// Consult `strategy` when a step fails.
    pub fn with_strategy(mut self, strategy: Arc<dyn ContinuationExceptionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Wait out delayed retries with `scheduler`.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// The continuation key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run step `key`, or return its remembered result.
    ///
    /// `block` is called with a fresh [`ContinuationContext`]. On success
    /// the value is remembered and returned. On failure, without a strategy
    /// the error is returned and nothing is remembered; with one, the step
    /// is retried until it succeeds or the strategy says `DontRetry`, in
    /// which case the last error is returned. Delayed retries never run
    /// before their scheduled time.
    pub async fn exec_block<T, F, Fut>(&self, key: &str, block: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(ContinuationContext) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let step_lock = self.step_lock(key).await;
        let result = {
            let _running = step_lock.lock().await;
            self.run_step(key, block).await
        };
        self.release_step_lock(key, step_lock).await;
        result
    }

    async fn run_step<T, F, Fut>(&self, key: &str, mut block: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(ContinuationContext) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(value) = self.results.lock().await.get(key).cloned() {
            debug!("Step {}/{} already done, skipping", self.key, key);
            return serde_json::from_value(value).map_err(|source| ContinuationError::Decode {
                key: key.to_string(),
                source,
            });
        }

        let mut ctx = ContinuationContext::new();
        loop {
            let error = match block(ctx).await {
                Ok(value) => {
                    let remembered = serde_json::to_value(&value)?;
                    self.results.lock().await.insert(key.to_string(), remembered);
                    debug!("Step {}/{} done after {} retries", self.key, key, ctx.attempts);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let Some(strategy) = &self.strategy else {
                return Err(ContinuationError::Block(error));
            };
            match strategy.handle(ctx, &error) {
                RetryStrategy::DontRetry(_) => {
                    warn!("Step {}/{} failed, giving up: {}", self.key, key, error);
                    return Err(ContinuationError::Block(error));
                }
                RetryStrategy::ImmediateRetry(next) => {
                    info!("Step {}/{} failed, retrying: {}", self.key, key, error);
                    ctx = next;
                }
                RetryStrategy::DelayedRetry(next, scheduled_time) => {
                    info!("Step {}/{} failed, retrying at {}: {}", self.key, key, scheduled_time, error);
                    self.scheduler.wait_until(key, next, scheduled_time).await;
                    ctx = next;
                }
            }
        }
    }

    /// Whether step `key` has a remembered result.
    pub async fn is_done(&self, key: &str) -> bool {
        self.results.lock().await.contains_key(key)
    }

    /// Keys of the finished steps, sorted.
    pub async fn done_steps(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.results.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn step_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.step_locks
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Forget the lock for `key` unless another caller is waiting on it.
    async fn release_step_lock(&self, key: &str, step_lock: Arc<Mutex<()>>) {
        let mut locks = self.step_locks.lock().await;
        // one reference in the map, one here
        if Arc::strong_count(&step_lock) == 2 {
            locks.remove(key);
        }
        // counts are only read under the map lock, so drop ours under it too
        drop(step_lock);
    }

    #[cfg(test)]
    async fn step_lock_count(&self) -> usize {
        self.step_locks.lock().await.len()
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation")
            .field("key", &self.key)
            .field("has_strategy", &self.strategy.is_some())
            .finish_non_exhaustive()
    }
}

/// Hands out one [`Continuation`] per continuation key.
///
/// Every continuation it creates shares the factory's strategy and
/// scheduler.
pub struct ContinuationFactory {
    continuations: Mutex<HashMap<String, Arc<Continuation>>>,
    strategy: Option<Arc<dyn ContinuationExceptionStrategy>>,
    scheduler: Arc<dyn Scheduler>,
}

impl ContinuationFactory {
    /// A factory whose continuations do not retry.
    pub fn new() -> Self {
        Self {
            continuations: Mutex::new(HashMap::new()),
            strategy: None,
            scheduler: Arc::new(TokioScheduler::new()),
        }
    }

    /// Linear backoff from `config`, capped at `max_attempts` if set.
    pub fn from_config(config: &RetryConfig) -> Self {
        let forever: Arc<dyn ContinuationExceptionStrategy> =
            Arc::new(RetryForEverExceptionStrategy::new(config.initial_delay_ms));
        let strategy = match config.max_attempts {
            Some(max_attempts) => Arc::new(LimitedRetryStrategy::new(forever, max_attempts)),
            None => forever,
        };
        Self::new().with_strategy(strategy)
    }

    /// Set the strategy for continuations created from now on.
    pub fn with_strategy(mut self, strategy: Arc<dyn ContinuationExceptionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the scheduler for continuations created from now on.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// The continuation for `continuation_key`, created on first use.
    pub async fn get(&self, continuation_key: &str) -> Arc<Continuation> {
        self.continuations
            .lock()
            .await
            .entry(continuation_key.to_string())
            .or_insert_with(|| {
                let mut continuation =
                    Continuation::new(continuation_key).with_scheduler(self.scheduler.clone());
                if let Some(strategy) = &self.strategy {
                    continuation = continuation.with_strategy(strategy.clone());
                }
                Arc::new(continuation)
            })
            .clone()
    }
}

impl Default for ContinuationFactory {
    fn default() -> Self {
        Self::new()
    }
}
