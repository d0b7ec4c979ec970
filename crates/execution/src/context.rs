//! The execution context passed to every task.

use crate::config::RuntimeConfig;
use crate::pool::WorkerPool;
use std::sync::Arc;
use taskmill_core::{LogLevel, LogMessage, ProvisioningState, UniqueId};
use taskmill_logging::{
    ConsoleLoggingConsumerContext, LoggingProducerContext, LoggingProducerToConsumer, OutputStream,
};
use taskmill_process::ProcessManager;

/// Everything a task needs to run: ids for tracing, a logging handle, a
/// worker pool, the process manager and the provisioning state so far.
///
/// A context is never changed in place. Each `with_*` call returns a new
/// context that shares all other fields with the original, which is how a
/// task id or provisioning state is threaded down a call chain.
#[derive(Clone)]
pub struct ExecutionContext {
    execution_id: UniqueId,
    task_id: Option<UniqueId>,
    instance_qualifier: Option<String>,
    provisioning_state: Arc<ProvisioningState>,
    logging: Arc<dyn LoggingProducerContext>,
    executor: WorkerPool,
    process_manager: Arc<ProcessManager>,
}

impl ExecutionContext {
    /// A context with all defaults.
    pub fn new() -> Self {
        ExecutionContextBuilder::new().build()
    }

    /// Start building a context.
    pub fn builder() -> ExecutionContextBuilder {
        ExecutionContextBuilder::new()
    }

    /// Copy claimed by `task_id`.
    pub fn with_task_id(&self, task_id: UniqueId) -> Self {
        Self {
            task_id: Some(task_id),
            ..self.clone()
        }
    }

    /// Copy carrying `state`.
    pub fn with_provisioning_state(&self, state: ProvisioningState) -> Self {
        Self {
            provisioning_state: Arc::new(state),
            ..self.clone()
        }
    }

    /// Copy with an instance qualifier.
    pub fn with_instance_qualifier(&self, qualifier: impl Into<String>) -> Self {
        Self {
            instance_qualifier: Some(qualifier.into()),
            ..self.clone()
        }
    }

    /// Copy writing logs and output to `logging`.
    pub fn with_logging_producer_context(&self, logging: Arc<dyn LoggingProducerContext>) -> Self {
        Self {
            logging,
            ..self.clone()
        }
    }

    /// Trace id shared by every task in one logical invocation chain.
    pub fn execution_id(&self) -> &UniqueId {
        &self.execution_id
    }

    /// The task that claimed this context, if any.
    pub fn task_id(&self) -> Option<&UniqueId> {
        self.task_id.as_ref()
    }

    /// Disambiguates co-located service instances.
    pub fn instance_qualifier(&self) -> Option<&str> {
        self.instance_qualifier.as_deref()
    }

    /// Provisioning outputs accumulated so far.
    pub fn provisioning_state(&self) -> &ProvisioningState {
        &self.provisioning_state
    }

    /// Logging producer.
    pub fn logging(&self) -> &Arc<dyn LoggingProducerContext> {
        &self.logging
    }

    /// Worker pool for background work.
    pub fn executor(&self) -> &WorkerPool {
        &self.executor
    }

    /// Process manager.
    pub fn process_manager(&self) -> &Arc<ProcessManager> {
        &self.process_manager
    }

    /// Log `body` stamped with this context's ids.
    pub fn log(&self, level: LogLevel, body: impl Into<String>) {
        let mut msg = LogMessage::new(self.execution_id.clone(), level, body);
        if let Some(task_id) = &self.task_id {
            msg = msg.with_task_id(task_id.clone());
        }
        self.logging.log(msg);
    }

    /// Line-buffered stdout for the task.
    pub fn stdout(&self) -> OutputStream {
        self.logging.stdout()
    }

    /// Line-buffered stderr for the task.
    pub fn stderr(&self) -> OutputStream {
        self.logging.stderr()
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("execution_id", &self.execution_id)
            .field("task_id", &self.task_id)
            .field("instance_qualifier", &self.instance_qualifier)
            .field("provisioning_tag", &self.provisioning_state.tag())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExecutionContext`].
///
/// Unset fields default to a fresh execution id, console logging, the
/// default worker pool, a new process manager and empty provisioning state.
#[derive(Default)]
pub struct ExecutionContextBuilder {
    execution_id: Option<UniqueId>,
    instance_qualifier: Option<String>,
    provisioning_state: Option<ProvisioningState>,
    logging: Option<Arc<dyn LoggingProducerContext>>,
    executor: Option<WorkerPool>,
    process_manager: Option<Arc<ProcessManager>>,
}

impl ExecutionContextBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool and console format taken from `config`.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let console = ConsoleLoggingConsumerContext::with_format(config.log_format);
        Self::new()
            .with_executor(WorkerPool::from_config(&config.executor))
            .with_logging(Arc::new(LoggingProducerToConsumer::new(Arc::new(console))))
    }

    /// Set the execution id.
    pub fn with_execution_id(mut self, execution_id: UniqueId) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    /// Set the instance qualifier.
    pub fn with_instance_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.instance_qualifier = Some(qualifier.into());
        self
    }

    /// Set the provisioning state.
    pub fn with_provisioning_state(mut self, state: ProvisioningState) -> Self {
        self.provisioning_state = Some(state);
        self
    }

    /// Set the logging producer.
    pub fn with_logging(mut self, logging: Arc<dyn LoggingProducerContext>) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the worker pool.
    pub fn with_executor(mut self, executor: WorkerPool) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the process manager.
    pub fn with_process_manager(mut self, process_manager: Arc<ProcessManager>) -> Self {
        self.process_manager = Some(process_manager);
        self
    }

    /// Build the context.
    pub fn build(self) -> ExecutionContext {
        ExecutionContext {
            execution_id: self.execution_id.unwrap_or_default(),
            task_id: None,
            instance_qualifier: self.instance_qualifier,
            provisioning_state: Arc::new(self.provisioning_state.unwrap_or_default()),
            logging: self.logging.unwrap_or_else(|| {
                Arc::new(LoggingProducerToConsumer::new(Arc::new(ConsoleLoggingConsumerContext::new())))
            }),
            executor: self.executor.unwrap_or_default(),
            process_manager: self.process_manager.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use taskmill_core::StageOutputs;
    use taskmill_logging::{InMemoryLogging, LoggingReaderContext};

    fn outputs(pairs: &[(&str, serde_json::Value)]) -> StageOutputs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_with_task_id_leaves_original_unchanged() {
        let ctx = ExecutionContext::new().with_instance_qualifier("blue");
        let task_id = UniqueId::random(6);

        let claimed = ctx.with_task_id(task_id.clone());

        assert_eq!(ctx.task_id(), None);
        assert_eq!(claimed.task_id(), Some(&task_id));
        assert_eq!(claimed.execution_id(), ctx.execution_id());
        assert_eq!(claimed.instance_qualifier(), Some("blue"));
        assert_eq!(claimed.provisioning_state(), ctx.provisioning_state());
        assert!(Arc::ptr_eq(claimed.logging(), ctx.logging()));
        assert!(Arc::ptr_eq(claimed.process_manager(), ctx.process_manager()));
        assert_eq!(claimed.executor().max_concurrent(), ctx.executor().max_concurrent());
    }

    #[test]
    fn test_with_instance_qualifier() {
        let ctx = ExecutionContext::new();
        let qualified = ctx.with_instance_qualifier("node-2");
        assert_eq!(ctx.instance_qualifier(), None);
        assert_eq!(qualified.instance_qualifier(), Some("node-2"));
        assert_eq!(qualified.execution_id(), ctx.execution_id());
    }

    #[test]
    fn test_latest_provisioning_state_wins() {
        let base = ExecutionContext::new();
        let first = ProvisioningState::new().store_output("create-server", outputs(&[("ip", json!("10.0.0.1"))]));
        let second = ProvisioningState::new()
            .store_output("create-db", outputs(&[("port", json!(5432))]))
            .store_output("create-dns", outputs(&[("name", json!("db.local"))]));

        let ctx = base.with_provisioning_state(first).with_provisioning_state(second);

        assert_eq!(ctx.provisioning_state().stages(), vec!["create-db", "create-dns"]);
        assert!(base.provisioning_state().stages().is_empty());
    }

    #[test]
    fn test_log_stamps_ids() {
        let consumer = Arc::new(InMemoryLogging::new());
        let execution_id = UniqueId::random(8);
        let ctx = ExecutionContext::builder()
            .with_execution_id(execution_id.clone())
            .with_logging(Arc::new(LoggingProducerToConsumer::new(consumer.clone())))
            .build();
        let task_id = UniqueId::random(6);

        ctx.log(LogLevel::Info, "before claim");
        ctx.with_task_id(task_id.clone()).log(LogLevel::Warn, "after claim");

        let messages = consumer.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].execution_id, execution_id);
        assert_eq!(messages[0].task_id, None);
        assert_eq!(messages[1].task_id, Some(task_id));
        assert_eq!(messages[1].level, LogLevel::Warn);
    }

    #[test]
    fn test_swap_logging_producer() {
        let first = Arc::new(InMemoryLogging::new());
        let second = Arc::new(InMemoryLogging::new());
        let ctx = ExecutionContext::builder()
            .with_logging(Arc::new(LoggingProducerToConsumer::new(first.clone())))
            .build();
        let redirected = ctx.with_logging_producer_context(Arc::new(LoggingProducerToConsumer::new(second.clone())));

        writeln!(ctx.stdout(), "to first").unwrap();
        writeln!(redirected.stdout(), "to second").unwrap();
        writeln!(redirected.stderr(), "err second").unwrap();

        assert_eq!(first.stdout(), "to first\n");
        assert_eq!(second.stdout(), "to second\n");
        assert_eq!(second.stderr(), "err second\n");
    }

    #[test]
    fn test_from_config() {
        let config = RuntimeConfig::new().with_executor(crate::config::ExecutorConfig { max_concurrent: None });
        let ctx = ExecutionContextBuilder::from_config(&config).build();
        assert_eq!(ctx.executor().max_concurrent(), None);
    }
}
