//! Worker pool for work handed off by tasks.

use crate::config::ExecutorConfig;
use crate::error::{panic_message, Result, TaskError};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

/// Runs submitted work on the tokio runtime, optionally capped at
/// `max_concurrent` units running at once.
///
/// Clones share the same cap, so every context derived from one context
/// draws from one pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Option<Arc<Semaphore>>,
    max_concurrent: Option<NonZeroUsize>,
}

impl WorkerPool {
    /// At most `max_concurrent` units of work at once.
    pub fn bounded(max_concurrent: NonZeroUsize) -> Self {
        Self {
            permits: Some(Arc::new(Semaphore::new(max_concurrent.get()))),
            max_concurrent: Some(max_concurrent),
        }
    }

    /// No cap.
    pub fn unbounded() -> Self {
        Self {
            permits: None,
            max_concurrent: None,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &ExecutorConfig) -> Self {
        match config.max_concurrent {
            Some(max) => Self::bounded(max),
            None => Self::unbounded(),
        }
    }

    /// The cap, if bounded.
    pub fn max_concurrent(&self) -> Option<NonZeroUsize> {
        self.max_concurrent
    }

    /// Free slots right now, if bounded.
    pub fn available(&self) -> Option<usize> {
        self.permits.as_ref().map(|p| p.available_permits())
    }

    /// Run `work` in the background and return immediately.
    ///
    /// Work queues until a slot is free; nothing submitted is ever cancelled
    /// by the pool.
    pub fn submit<F>(&self, work: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            let _permit = acquire(permits).await;
            work.await
        })
    }

    /// Run blocking or CPU heavy `work` on tokio's blocking threads, counted
    /// against the same cap, and wait for it.
    pub async fn submit_blocking<F, R>(&self, work: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let _permit = acquire(self.permits.clone()).await;
        tokio::task::spawn_blocking(work).await.map_err(|e| {
            if e.is_panic() {
                TaskError::Panicked(panic_message(&*e.into_panic()))
            } else {
                TaskError::Panicked(e.to_string())
            }
        })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::from_config(&ExecutorConfig::default())
    }
}

async fn acquire(permits: Option<Arc<Semaphore>>) -> Option<OwnedSemaphorePermit> {
    let permits = permits?;
    if permits.available_permits() == 0 {
        debug!("Worker pool full, queueing work");
    }
    // the semaphore is never closed
    permits.acquire_owned().await.ok()
}
