//! Creating tasks by name.
//!
//! Tasks are registered under a name together with a constructor closure.
//! Constructors receive the shared [`TaskDependencies`], so a task that needs
//! to resolve result channels gets the same sink factory as everyone else.

use crate::task::{AsyncTask, BlockingTask, DynAsyncTask, DynBlockingTask, JsonAsyncTask, JsonBlockingTask, Task};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use taskmill_channel::{AsyncResultChannelSinkFactory, DefaultAsyncResultChannelSinkFactory, InMemoryAsyncResultChannel};
use taskmill_core::UniqueId;
use taskmill_logging::{DefaultLoggingChannelFactory, InMemoryLoggingRepo};
use tracing::debug;

/// Errors from the task factory.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// Nothing registered under that name
    #[error("task `{0}` is not registered")]
    NotRegistered(String),

    /// The name is taken
    #[error("task `{0}` is already registered")]
    AlreadyRegistered(String),

    /// Registered, but not as the requested kind of task
    #[error("task `{name}` is not a {expected} task")]
    WrongKind {
        /// Requested name
        name: String,
        /// Kind the caller asked for
        expected: TaskKind,
    },
}

/// Blocking or async.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Returns its output to the caller
    Blocking,
    /// Delivers its output through a result channel
    Async,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Blocking => write!(f, "blocking"),
            TaskKind::Async => write!(f, "async"),
        }
    }
}

/// Shared services handed to every task constructor.
#[derive(Clone)]
pub struct TaskDependencies {
    /// Resolves result channel locators
    pub sinks: Arc<dyn AsyncResultChannelSinkFactory>,
    /// Resolves logging channel locators
    pub logging: Arc<DefaultLoggingChannelFactory>,
}

impl TaskDependencies {
    /// Use the given factories.
    pub fn new(sinks: Arc<dyn AsyncResultChannelSinkFactory>, logging: Arc<DefaultLoggingChannelFactory>) -> Self {
        Self { sinks, logging }
    }

    /// `LOCAL` resolves to `channel`; logging channels live in a new repo.
    pub fn local(channel: Arc<InMemoryAsyncResultChannel>) -> Self {
        Self::new(
            Arc::new(DefaultAsyncResultChannelSinkFactory::new(channel)),
            Arc::new(DefaultLoggingChannelFactory::new(Arc::new(InMemoryLoggingRepo::new()))),
        )
    }
}

impl Default for TaskDependencies {
    fn default() -> Self {
        Self::local(Arc::new(InMemoryAsyncResultChannel::new()))
    }
}

/// A task instance of either kind.
#[derive(Clone)]
pub enum RegisteredTask {
    /// Blocking task
    Blocking(DynBlockingTask),
    /// Async task
    Async(DynAsyncTask),
}

impl RegisteredTask {
    /// Which kind this is.
    pub fn kind(&self) -> TaskKind {
        match self {
            RegisteredTask::Blocking(_) => TaskKind::Blocking,
            RegisteredTask::Async(_) => TaskKind::Async,
        }
    }

    /// The instance's id.
    pub fn task_id(&self) -> &UniqueId {
        match self {
            RegisteredTask::Blocking(task) => task.task_id(),
            RegisteredTask::Async(task) => task.task_id(),
        }
    }
}

type Constructor<T> = Box<dyn Fn(&TaskDependencies) -> T + Send + Sync>;

enum Registration {
    Blocking(Constructor<DynBlockingTask>),
    Async(Constructor<DynAsyncTask>),
}

/// Registration table mapping task names to constructors.
pub struct TaskFactory {
    dependencies: TaskDependencies,
    registrations: BTreeMap<String, Registration>,
}

impl TaskFactory {
    /// Create an empty factory whose tasks receive `dependencies`.
    pub fn new(dependencies: TaskDependencies) -> Self {
        Self {
            dependencies,
            registrations: BTreeMap::new(),
        }
    }

    /// Register a blocking task.
    pub fn register_blocking<I, O, T, F>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), FactoryError>
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
        T: BlockingTask<I, O> + 'static,
        F: Fn(&TaskDependencies) -> T + Send + Sync + 'static,
    {
        let erased: Constructor<DynBlockingTask> = Box::new(move |deps: &TaskDependencies| -> DynBlockingTask {
            Arc::new(JsonBlockingTask::<T, I, O>::new(constructor(deps)))
        });
        self.insert(name.into(), Registration::Blocking(erased))
    }

    /// Register an async task.
    pub fn register_async<I, O, T, F>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), FactoryError>
    where
        I: DeserializeOwned + Send + 'static,
        O: Send + 'static,
        T: AsyncTask<I, O> + 'static,
        F: Fn(&TaskDependencies) -> T + Send + Sync + 'static,
    {
        let erased: Constructor<DynAsyncTask> = Box::new(move |deps: &TaskDependencies| -> DynAsyncTask {
            Arc::new(JsonAsyncTask::<T, I, O>::new(constructor(deps)))
        });
        self.insert(name.into(), Registration::Async(erased))
    }

    fn insert(&mut self, name: String, registration: Registration) -> Result<(), FactoryError> {
        if self.registrations.contains_key(&name) {
            return Err(FactoryError::AlreadyRegistered(name));
        }
        debug!("Registered task {}", name);
        self.registrations.insert(name, registration);
        Ok(())
    }

    /// Registered names with their kinds, sorted by name.
    pub fn list(&self) -> Vec<(&str, TaskKind)> {
        self.registrations
            .iter()
            .map(|(name, registration)| {
                let kind = match registration {
                    Registration::Blocking(_) => TaskKind::Blocking,
                    Registration::Async(_) => TaskKind::Async,
                };
                (name.as_str(), kind)
            })
            .collect()
    }

    /// A new instance of the task registered as `name`.
    pub fn create_instance(&self, name: &str) -> Result<RegisteredTask, FactoryError> {
        match self.registrations.get(name) {
            Some(Registration::Blocking(constructor)) => Ok(RegisteredTask::Blocking(constructor(&self.dependencies))),
            Some(Registration::Async(constructor)) => Ok(RegisteredTask::Async(constructor(&self.dependencies))),
            None => Err(FactoryError::NotRegistered(name.to_string())),
        }
    }

    /// A new instance of the blocking task `name`.
    pub fn create_blocking(&self, name: &str) -> Result<DynBlockingTask, FactoryError> {
        match self.create_instance(name)? {
            RegisteredTask::Blocking(task) => Ok(task),
            RegisteredTask::Async(_) => Err(FactoryError::WrongKind {
                name: name.to_string(),
                expected: TaskKind::Blocking,
            }),
        }
    }

    /// A new instance of the async task `name`.
    pub fn create_async(&self, name: &str) -> Result<DynAsyncTask, FactoryError> {
        match self.create_instance(name)? {
            RegisteredTask::Async(task) => Ok(task),
            RegisteredTask::Blocking(_) => Err(FactoryError::WrongKind {
                name: name.to_string(),
                expected: TaskKind::Async,
            }),
        }
    }

    /// The services handed to constructors.
    pub fn dependencies(&self) -> &TaskDependencies {
        &self.dependencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::demo::{register_demo_tasks, CalcSquareTask};
    use serde_json::json;

    fn demo_factory() -> TaskFactory {
        let mut factory = TaskFactory::new(TaskDependencies::default());
        register_demo_tasks(&mut factory).unwrap();
        factory
    }

    #[test]
    fn test_list_sorted() {
        let factory = demo_factory();
        assert_eq!(
            factory.list(),
            vec![
                ("CalcSquareAsyncTask", TaskKind::Async),
                ("CalcSquareTask", TaskKind::Blocking),
                ("EchoToConsoleTask", TaskKind::Blocking),
                ("ExceptionThrowingTask", TaskKind::Blocking),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_by_name() {
        let factory = demo_factory();
        let task = factory.create_blocking("CalcSquareTask").unwrap();
        assert_eq!(task.exec(&ExecutionContext::new(), json!(4)).await.unwrap(), json!(16));
    }

    #[test]
    fn test_each_instance_is_new() {
        let factory = demo_factory();
        let first = factory.create_instance("CalcSquareTask").unwrap();
        let second = factory.create_instance("CalcSquareTask").unwrap();
        assert_ne!(first.task_id(), second.task_id());
        assert_eq!(first.kind(), TaskKind::Blocking);
    }

    #[test]
    fn test_lookup_failures() {
        let factory = demo_factory();
        assert!(matches!(
            factory.create_instance("NoSuchTask"),
            Err(FactoryError::NotRegistered(name)) if name == "NoSuchTask"
        ));
        assert!(matches!(
            factory.create_async("CalcSquareTask"),
            Err(FactoryError::WrongKind { expected: TaskKind::Async, .. })
        ));
        let err = factory.create_blocking("CalcSquareAsyncTask").err().unwrap();
        assert_eq!(err.to_string(), "task `CalcSquareAsyncTask` is not a blocking task");
    }

    #[test]
    fn test_duplicate_registration() {
        let mut factory = demo_factory();
        let result = factory.register_blocking::<i32, i32, _, _>("CalcSquareTask", |_| CalcSquareTask::new());
        assert!(matches!(result, Err(FactoryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_constructors_share_dependencies() {
        let factory = demo_factory();
        let deps = factory.dependencies().clone();
        assert!(Arc::ptr_eq(&deps.logging, &factory.dependencies().logging));
    }
}
