//! Running registered tasks by name.

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::factory::TaskFactory;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use taskmill_channel::AsyncResultChannelSinkLocator;
use taskmill_core::UniqueId;
use tracing::info;

/// Creates tasks from a [`TaskFactory`] and runs them.
///
/// Each call gets a fresh task instance, and the context is claimed for it
/// with [`ExecutionContext::with_task_id`] before it runs.
#[derive(Clone)]
pub struct TaskClient {
    factory: Arc<TaskFactory>,
}

impl TaskClient {
    /// Create a client over `factory`.
    pub fn new(factory: Arc<TaskFactory>) -> Self {
        Self { factory }
    }

    /// The underlying factory.
    pub fn factory(&self) -> &Arc<TaskFactory> {
        &self.factory
    }

    /// Run the blocking task `name` and return its output.
    pub async fn exec_blocking<I, O>(&self, ctx: &ExecutionContext, name: &str, input: I) -> Result<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        let task = self.factory.create_blocking(name)?;
        let ctx = ctx.with_task_id(task.task_id().clone());
        info!("Running blocking task {} ({})", name, task.task_id());

        let output = task.exec(&ctx, input).await?;
        Ok(serde_json::from_value(output)?)
    }

    /// Start the async task `name`; its result goes to `channel_id` on the
    /// channel behind `locator`.
    pub async fn exec_async<I>(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        locator: &AsyncResultChannelSinkLocator,
        channel_id: UniqueId,
        input: I,
    ) -> Result<()>
    where
        I: Serialize,
    {
        let input = serde_json::to_value(input)?;
        let task = self.factory.create_async(name)?;
        let ctx = ctx.with_task_id(task.task_id().clone());
        info!("Starting async task {} ({}) for channel {}", name, task.task_id(), channel_id);

        task.exec(&ctx, locator, channel_id, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::register_demo_tasks;
    use crate::error::TaskError;
    use crate::factory::{FactoryError, TaskDependencies};
    use taskmill_channel::{AsyncResultChannelQuery, AsyncResultChannelQueryExt, InMemoryAsyncResultChannel};
    use taskmill_core::AsyncResult;

    fn client(channel: Arc<InMemoryAsyncResultChannel>) -> TaskClient {
        let mut factory = TaskFactory::new(TaskDependencies::local(channel));
        register_demo_tasks(&mut factory).unwrap();
        TaskClient::new(Arc::new(factory))
    }

    #[tokio::test]
    async fn test_exec_blocking() {
        let client = client(Arc::new(InMemoryAsyncResultChannel::new()));
        let squared: i32 = client
            .exec_blocking(&ExecutionContext::new(), "CalcSquareTask", 7)
            .await
            .unwrap();
        assert_eq!(squared, 49);
    }

    #[tokio::test]
    async fn test_exec_blocking_error_is_verbatim() {
        let client = client(Arc::new(InMemoryAsyncResultChannel::new()));
        let err = client
            .exec_blocking::<_, String>(&ExecutionContext::new(), "ExceptionThrowingTask", "Opps")
            .await
            .unwrap_err();
        assert!(matches!(&err, TaskError::Failed(_)));
        assert_eq!(err.to_string(), "Opps");
    }

    #[tokio::test]
    async fn test_exec_async() {
        let channel = Arc::new(InMemoryAsyncResultChannel::new());
        let client = client(channel.clone());
        let id = UniqueId::random(6);

        client
            .exec_async(
                &ExecutionContext::new(),
                "CalcSquareAsyncTask",
                &AsyncResultChannelSinkLocator::local(),
                id.clone(),
                3,
            )
            .await
            .unwrap();

        let result = taskmill_channel::ResultWaiter::new(channel.clone())
            .wait_for::<i32>(&id)
            .await
            .unwrap();
        assert_eq!(result, AsyncResult::Success(9));
        assert!(channel.has_result(&id).await);
        assert_eq!(channel.result::<i32>(&id).await.unwrap(), AsyncResult::Success(9));
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let client = client(Arc::new(InMemoryAsyncResultChannel::new()));
        let err = client
            .exec_blocking::<_, i32>(&ExecutionContext::new(), "SquareRootTask", 4)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Factory(FactoryError::NotRegistered(_))));
    }
}
