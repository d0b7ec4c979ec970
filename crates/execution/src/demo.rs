//! Small ready-made tasks for demos and tests.

use crate::context::ExecutionContext;
use crate::error::{Result, TaskError};
use crate::factory::{FactoryError, TaskDependencies, TaskFactory};
use crate::task::{spawn_async_result, AsyncTask, BlockingTask, Task};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use taskmill_channel::{AsyncResultChannelSinkFactory, AsyncResultChannelSinkLocator};
use taskmill_core::{LogLevel, UniqueId};

fn square(n: i32) -> Result<i32> {
    n.checked_mul(n)
        .ok_or_else(|| TaskError::failed(format!("square of {n} overflows")))
}

/// Squares a number.
pub struct CalcSquareTask {
    task_id: UniqueId,
}

impl CalcSquareTask {
    /// Create the task.
    pub fn new() -> Self {
        Self { task_id: UniqueId::new() }
    }
}

impl Default for CalcSquareTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for CalcSquareTask {
    fn task_id(&self) -> &UniqueId {
        &self.task_id
    }
}

#[async_trait]
impl BlockingTask<i32, i32> for CalcSquareTask {
    async fn exec(&self, ctx: &ExecutionContext, input: i32) -> Result<i32> {
        let ctx = ctx.with_task_id(self.task_id.clone());
        ctx.log(LogLevel::Info, format!("Calculating square of {input}"));
        square(input)
    }
}

/// Squares a number in the background, after an optional delay.
pub struct CalcSquareAsyncTask {
    task_id: UniqueId,
    sinks: Arc<dyn AsyncResultChannelSinkFactory>,
    delay: Duration,
}

impl CalcSquareAsyncTask {
    /// Create the task, resolving locators through `sinks`.
    pub fn new(sinks: Arc<dyn AsyncResultChannelSinkFactory>) -> Self {
        Self {
            task_id: UniqueId::new(),
            sinks,
            delay: Duration::ZERO,
        }
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Task for CalcSquareAsyncTask {
    fn task_id(&self) -> &UniqueId {
        &self.task_id
    }
}

#[async_trait]
impl AsyncTask<i32, i32> for CalcSquareAsyncTask {
    async fn exec(
        &self,
        ctx: &ExecutionContext,
        locator: &AsyncResultChannelSinkLocator,
        channel_id: UniqueId,
        input: i32,
    ) -> Result<()> {
        let sink = self.sinks.create(locator)?;
        let ctx = ctx.with_task_id(self.task_id.clone());
        ctx.log(LogLevel::Info, format!("Calculating square of {input}"));

        let delay = self.delay;
        spawn_async_result(&ctx, sink, channel_id, async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            square(input)
        });
        Ok(())
    }
}

/// Always fails, using its input as the error message.
pub struct ExceptionThrowingTask {
    task_id: UniqueId,
}

impl ExceptionThrowingTask {
    /// Create the task.
    pub fn new() -> Self {
        Self { task_id: UniqueId::new() }
    }
}

impl Default for ExceptionThrowingTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for ExceptionThrowingTask {
    fn task_id(&self) -> &UniqueId {
        &self.task_id
    }
}

#[async_trait]
impl BlockingTask<String, String> for ExceptionThrowingTask {
    async fn exec(&self, _ctx: &ExecutionContext, input: String) -> Result<String> {
        Err(TaskError::failed(input))
    }
}

/// Writes its input to the task's stdout.
pub struct EchoToConsoleTask {
    task_id: UniqueId,
}

impl EchoToConsoleTask {
    /// Create the task.
    pub fn new() -> Self {
        Self { task_id: UniqueId::new() }
    }
}

impl Default for EchoToConsoleTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for EchoToConsoleTask {
    fn task_id(&self) -> &UniqueId {
        &self.task_id
    }
}

#[async_trait]
impl BlockingTask<String, ()> for EchoToConsoleTask {
    async fn exec(&self, ctx: &ExecutionContext, input: String) -> Result<()> {
        let mut out = ctx.stdout();
        writeln!(out, "{input}").map_err(anyhow::Error::from)?;
        Ok(())
    }
}

/// Register every demo task under its type name.
pub fn register_demo_tasks(factory: &mut TaskFactory) -> std::result::Result<(), FactoryError> {
    factory.register_blocking::<i32, i32, _, _>("CalcSquareTask", |_| CalcSquareTask::new())?;
    factory.register_async::<i32, i32, _, _>("CalcSquareAsyncTask", |deps: &TaskDependencies| {
        CalcSquareAsyncTask::new(deps.sinks.clone())
    })?;
    factory.register_blocking::<String, String, _, _>("ExceptionThrowingTask", |_| ExceptionThrowingTask::new())?;
    factory.register_blocking::<String, (), _, _>("EchoToConsoleTask", |_| EchoToConsoleTask::new())?;
    Ok(())
}
