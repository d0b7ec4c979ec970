//! Re-running a blocking task until its output is acceptable.

use crate::context::ExecutionContext;
use crate::error::{Result, TaskError};
use crate::task::{BlockingTask, Task};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::time::Duration;
use taskmill_core::UniqueId;
use tokio::time::Instant;
use tracing::debug;

/// Runs `inner` every `interval` until `until` accepts its output, failing
/// with [`TaskError::Timeout`] once `max_wait` has passed. An error from
/// `inner` stops polling and is returned as is.
pub struct PollBlockingTask<T, I, O> {
    task_id: UniqueId,
    inner: T,
    until: Box<dyn Fn(&O) -> bool + Send + Sync>,
    interval: Duration,
    max_wait: Duration,
    _types: PhantomData<fn(I) -> O>,
}

impl<T, I, O> PollBlockingTask<T, I, O> {
    /// Poll `inner` once a second for up to a minute.
    pub fn new(inner: T, until: impl Fn(&O) -> bool + Send + Sync + 'static) -> Self {
        Self {
            task_id: UniqueId::new(),
            inner,
            until: Box::new(until),
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
            _types: PhantomData,
        }
    }

    /// Time between runs.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Give up after this long.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

impl<T: Send + Sync, I, O> Task for PollBlockingTask<T, I, O> {
    fn task_id(&self) -> &UniqueId {
        &self.task_id
    }
}

#[async_trait]
impl<T, I, O> BlockingTask<I, O> for PollBlockingTask<T, I, O>
where
    T: BlockingTask<I, O>,
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    async fn exec(&self, ctx: &ExecutionContext, input: I) -> Result<O> {
        let deadline = Instant::now() + self.max_wait;
        let mut runs = 0u32;
        loop {
            let output = self.inner.exec(ctx, input.clone()).await?;
            runs += 1;
            if (self.until)(&output) {
                debug!("Poll task {} satisfied after {} runs", self.task_id, runs);
                return Ok(output);
            }
            if Instant::now() >= deadline {
                return Err(TaskError::Timeout(self.max_wait));
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter {
        task_id: UniqueId,
        calls: AtomicU32,
        fail_at: Option<u32>,
    }

    impl Counter {
        fn new(fail_at: Option<u32>) -> Self {
            Self {
                task_id: UniqueId::new(),
                calls: AtomicU32::new(0),
                fail_at,
            }
        }
    }

    impl Task for Counter {
        fn task_id(&self) -> &UniqueId {
            &self.task_id
        }
    }

    #[async_trait]
    impl BlockingTask<(), u32> for Counter {
        async fn exec(&self, _ctx: &ExecutionContext, _input: ()) -> Result<u32> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(n) == self.fail_at {
                return Err(TaskError::failed("counter broke"));
            }
            Ok(n)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_accepted() {
        let task = PollBlockingTask::<_, (), u32>::new(Counter::new(None), |n| *n >= 3)
            .with_interval(Duration::from_millis(10));
        let started = Instant::now();

        assert_eq!(task.exec(&ExecutionContext::new(), ()).await.unwrap(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(20) && elapsed < Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let task = PollBlockingTask::<_, (), u32>::new(Counter::new(None), |_| false)
            .with_interval(Duration::from_secs(1))
            .with_max_wait(Duration::from_secs(5));

        let err = task.exec(&ExecutionContext::new(), ()).await.unwrap_err();
        assert!(matches!(err, TaskError::Timeout(d) if d == Duration::from_secs(5)));
        assert_eq!(task.inner.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_stops_polling() {
        let task = PollBlockingTask::<_, (), u32>::new(Counter::new(Some(2)), |_| false)
            .with_interval(Duration::from_millis(10));

        let err = task.exec(&ExecutionContext::new(), ()).await.unwrap_err();
        assert_eq!(err.to_string(), "counter broke");
        assert_eq!(task.inner.calls.load(Ordering::SeqCst), 2);
    }
}
