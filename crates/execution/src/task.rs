//! Task traits and the async submission contract.

use crate::context::ExecutionContext;
use crate::error::{panic_message, Result};
use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use taskmill_channel::{
    AsyncResultChannelMessage, AsyncResultChannelSink, AsyncResultChannelSinkFactory, AsyncResultChannelSinkLocator,
    Delivery,
};
use taskmill_core::UniqueId;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A unit of work with a stable identity.
pub trait Task: Send + Sync {
    /// Assigned once, when the task is constructed.
    fn task_id(&self) -> &UniqueId;
}

/// A task whose output is returned to the caller.
///
/// Runs on the caller's own execution path; it never hands work to the
/// worker pool behind the caller's back. Errors reach the caller unchanged.
#[async_trait]
pub trait BlockingTask<I: Send + 'static, O: Send + 'static>: Task {
    /// Run the task.
    async fn exec(&self, ctx: &ExecutionContext, input: I) -> Result<O>;
}

/// A task that delivers its output through a result channel.
///
/// `exec` resolves the sink for `locator` first, so a bad locator fails the
/// call itself. It then submits the work to the context's worker pool and
/// returns. The submitted work writes exactly one message for `channel_id`.
#[async_trait]
pub trait AsyncTask<I: Send + 'static, O: Send + 'static>: Task {
    /// Start the task.
    async fn exec(
        &self,
        ctx: &ExecutionContext,
        locator: &AsyncResultChannelSinkLocator,
        channel_id: UniqueId,
        input: I,
    ) -> Result<()>;
}

/// A blocking task over JSON values.
pub type DynBlockingTask = Arc<dyn BlockingTask<Value, Value>>;

/// An async task over JSON values.
pub type DynAsyncTask = Arc<dyn AsyncTask<Value, Value>>;

/// Submit `work` to the context's pool and write its outcome to `sink`.
///
/// Success becomes `Success(value)`; an error or a panic becomes
/// `Fail(message)`. Either way exactly one message is written.
pub fn spawn_async_result<O, F>(
    ctx: &ExecutionContext,
    sink: Arc<dyn AsyncResultChannelSink>,
    channel_id: UniqueId,
    work: F,
) -> JoinHandle<()>
where
    O: Serialize + Send + 'static,
    F: Future<Output = Result<O>> + Send + 'static,
{
    debug!("Submitting work for channel {}", channel_id);
    ctx.executor().submit(async move {
        let message = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(value)) => AsyncResultChannelMessage::success(channel_id.clone(), &value)
                .unwrap_or_else(|e| AsyncResultChannelMessage::fail::<O>(channel_id.clone(), e.to_string())),
            Ok(Err(e)) => AsyncResultChannelMessage::fail::<O>(channel_id.clone(), e.to_string()),
            Err(panic) => AsyncResultChannelMessage::fail::<O>(
                channel_id.clone(),
                format!("task panicked: {}", panic_message(&*panic)),
            ),
        };
        match sink.accept(message).await {
            Ok(Delivery::Stored) => debug!("Delivered result for channel {}", channel_id),
            Ok(Delivery::Ignored) => {}
            Err(e) => error!("Could not deliver result for channel {}: {}", channel_id, e),
        }
    })
}

/// Runs a [`BlockingTask`] as an [`AsyncTask`] on the worker pool.
pub struct BlockingAsAsync<T> {
    inner: Arc<T>,
    sinks: Arc<dyn AsyncResultChannelSinkFactory>,
}

impl<T> BlockingAsAsync<T> {
    /// Wrap `inner`, resolving locators through `sinks`.
    pub fn new(inner: T, sinks: Arc<dyn AsyncResultChannelSinkFactory>) -> Self {
        Self {
            inner: Arc::new(inner),
            sinks,
        }
    }
}

impl<T: Task> Task for BlockingAsAsync<T> {
    fn task_id(&self) -> &UniqueId {
        self.inner.task_id()
    }
}

#[async_trait]
impl<T, I, O> AsyncTask<I, O> for BlockingAsAsync<T>
where
    T: BlockingTask<I, O> + 'static,
    I: Send + 'static,
    O: Serialize + Send + 'static,
{
    async fn exec(
        &self,
        ctx: &ExecutionContext,
        locator: &AsyncResultChannelSinkLocator,
        channel_id: UniqueId,
        input: I,
    ) -> Result<()> {
        let sink = self.sinks.create(locator)?;
        let inner = self.inner.clone();
        let task_ctx = ctx.clone();
        spawn_async_result(ctx, sink, channel_id, async move { inner.exec(&task_ctx, input).await });
        Ok(())
    }
}

/// Adapts a typed [`BlockingTask`] to JSON input and output.
pub struct JsonBlockingTask<T, I, O> {
    inner: T,
    _types: PhantomData<fn(I) -> O>,
}

impl<T, I, O> JsonBlockingTask<T, I, O> {
    /// Wrap `inner`.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            _types: PhantomData,
        }
    }
}

impl<T: Task, I, O> Task for JsonBlockingTask<T, I, O> {
    fn task_id(&self) -> &UniqueId {
        self.inner.task_id()
    }
}

#[async_trait]
impl<T, I, O> BlockingTask<Value, Value> for JsonBlockingTask<T, I, O>
where
    T: BlockingTask<I, O>,
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    async fn exec(&self, ctx: &ExecutionContext, input: Value) -> Result<Value> {
        let input: I = serde_json::from_value(input)?;
        let output = self.inner.exec(ctx, input).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Adapts a typed [`AsyncTask`] to JSON input. The channel still receives
/// the task's own output type.
pub struct JsonAsyncTask<T, I, O> {
    inner: T,
    _types: PhantomData<fn(I) -> O>,
}

impl<T, I, O> JsonAsyncTask<T, I, O> {
    /// Wrap `inner`.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            _types: PhantomData,
        }
    }
}

impl<T: Task, I, O> Task for JsonAsyncTask<T, I, O> {
    fn task_id(&self) -> &UniqueId {
        self.inner.task_id()
    }
}

#[async_trait]
impl<T, I, O> AsyncTask<Value, Value> for JsonAsyncTask<T, I, O>
where
    T: AsyncTask<I, O>,
    I: DeserializeOwned + Send + 'static,
    O: Send + 'static,
{
    async fn exec(
        &self,
        ctx: &ExecutionContext,
        locator: &AsyncResultChannelSinkLocator,
        channel_id: UniqueId,
        input: Value,
    ) -> Result<()> {
        let input: I = serde_json::from_value(input)?;
        self.inner.exec(ctx, locator, channel_id, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{CalcSquareTask, ExceptionThrowingTask};
    use crate::error::TaskError;
    use taskmill_channel::{
        AsyncResultChannelQuery, AsyncResultChannelQueryExt, ChannelError, DefaultAsyncResultChannelSinkFactory,
    };
    use taskmill_core::AsyncResult;

    fn channels() -> Arc<DefaultAsyncResultChannelSinkFactory> {
        Arc::new(DefaultAsyncResultChannelSinkFactory::default())
    }

    async fn explode() -> Result<i32> {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn test_spawn_async_result_writes_success() {
        let factory = channels();
        let ctx = ExecutionContext::new();
        let id = UniqueId::random(6);
        let sink = factory.create(&AsyncResultChannelSinkLocator::local()).unwrap();

        spawn_async_result(&ctx, sink, id.clone(), async { Ok("done".to_string()) })
            .await
            .unwrap();

        let query = factory.channel_query(&AsyncResultChannelSinkLocator::local()).unwrap();
        assert_eq!(
            query.result::<String>(&id).await.unwrap(),
            AsyncResult::Success("done".to_string())
        );
    }

    #[tokio::test]
    async fn test_spawn_async_result_converts_errors_and_panics() {
        let factory = channels();
        let ctx = ExecutionContext::new();
        let failing = UniqueId::random(6);
        let panicking = UniqueId::random(6);
        let sink = factory.create(&AsyncResultChannelSinkLocator::local()).unwrap();

        spawn_async_result::<i32, _>(&ctx, sink.clone(), failing.clone(), async { Err(TaskError::failed("nope")) })
            .await
            .unwrap();
        spawn_async_result(&ctx, sink, panicking.clone(), explode())
            .await
            .unwrap();

        let query = factory.local().clone();
        assert_eq!(
            query.result::<i32>(&failing).await.unwrap(),
            AsyncResult::Fail("nope".to_string())
        );
        assert_eq!(
            query.result::<i32>(&panicking).await.unwrap(),
            AsyncResult::Fail("task panicked: kaboom".to_string())
        );
    }

    #[tokio::test]
    async fn test_blocking_as_async() {
        let factory = channels();
        let task = BlockingAsAsync::new(CalcSquareTask::new(), factory.clone());
        let ctx = ExecutionContext::new();
        let id = UniqueId::random(6);

        AsyncTask::<i32, i32>::exec(&task, &ctx, &AsyncResultChannelSinkLocator::local(), id.clone(), 12)
            .await
            .unwrap();
        assert!(!factory.local().has_result(&id).await);

        let waiter = taskmill_channel::ResultWaiter::new(factory.local().clone());
        assert_eq!(waiter.wait_for::<i32>(&id).await.unwrap(), AsyncResult::Success(144));
    }

    #[tokio::test]
    async fn test_unknown_locator_fails_synchronously() {
        let factory = channels();
        let task = BlockingAsAsync::new(CalcSquareTask::new(), factory.clone());
        let id = UniqueId::random(6);

        let result = AsyncTask::<i32, i32>::exec(
            &task,
            &ExecutionContext::new(),
            &AsyncResultChannelSinkLocator::new("SQS;queue"),
            id.clone(),
            3,
        )
        .await;

        assert!(matches!(result, Err(TaskError::Channel(ChannelError::UnknownLocator(_)))));
        assert!(factory.local().is_empty().await);
    }

    #[tokio::test]
    async fn test_json_blocking_task() {
        let task = JsonBlockingTask::<_, i32, i32>::new(CalcSquareTask::new());
        let ctx = ExecutionContext::new();

        let output = task.exec(&ctx, serde_json::json!(9)).await.unwrap();
        assert_eq!(output, serde_json::json!(81));

        let err = task.exec(&ctx, serde_json::json!("nine")).await.unwrap_err();
        assert!(matches!(err, TaskError::Json(_)));
    }

    #[tokio::test]
    async fn test_blocking_error_propagates_verbatim() {
        let task = ExceptionThrowingTask::new();
        let err = task.exec(&ExecutionContext::new(), "Opps".to_string()).await.unwrap_err();
        assert_eq!(err.to_string(), "Opps");
    }
}
