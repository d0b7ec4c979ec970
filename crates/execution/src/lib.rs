//! Task execution for taskmill.
//!
//! Tasks run against an [`ExecutionContext`]. A [`BlockingTask`] returns its
//! output to the caller; an [`AsyncTask`] hands its work to the context's
//! [`WorkerPool`] and delivers the output later through a result channel.
//! Tasks are created by name from a [`TaskFactory`] and most callers go
//! through a [`TaskClient`].

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod context;
pub mod demo;
pub mod error;
pub mod factory;
pub mod poll;
pub mod pool;
pub mod task;

pub use client::TaskClient;
pub use config::{ConfigError, ExecutorConfig, ResultPollConfig, RetryConfig, RuntimeConfig};
pub use context::{ExecutionContext, ExecutionContextBuilder};
pub use error::{Result, TaskError};
pub use factory::{FactoryError, RegisteredTask, TaskDependencies, TaskFactory, TaskKind};
pub use poll::PollBlockingTask;
pub use pool::WorkerPool;
pub use task::{
    spawn_async_result, AsyncTask, BlockingAsAsync, BlockingTask, DynAsyncTask, DynBlockingTask, JsonAsyncTask,
    JsonBlockingTask, Task,
};
