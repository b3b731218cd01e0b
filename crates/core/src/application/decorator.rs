// Task decorators - register a function on a queue, get back a callable handle

use crate::domain::{PeriodicOptions, TaskError, TaskFn, TaskOptions, TaskOutcome};
use crate::error::Result;
use crate::port::QueueClient;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// On-demand task decorator bound to one queue client
///
/// # Example
/// ```text
/// let add = registry
///     .task(Some("my-app"), TaskOptions::default())?
///     .apply("add", |args| Ok(json!(args[0].as_i64() + args[1].as_i64())))?;
/// let outcome = add.call(json!([1, 2]))?;
/// ```
#[derive(Clone)]
pub struct TaskDecorator {
    queue: Arc<dyn QueueClient>,
    options: TaskOptions,
}

impl TaskDecorator {
    pub fn new(queue: Arc<dyn QueueClient>, options: TaskOptions) -> Self {
        Self { queue, options }
    }

    pub fn queue(&self) -> &Arc<dyn QueueClient> {
        &self.queue
    }

    /// Register `func`; `options.name` takes precedence over `name`
    pub fn apply<F>(&self, name: &str, func: F) -> Result<TaskHandle>
    where
        F: Fn(Value) -> std::result::Result<Value, TaskError> + Send + Sync + 'static,
    {
        let name = self.options.name.clone().unwrap_or_else(|| name.to_string());
        let func: TaskFn = Arc::new(func);
        self.queue.register_task(&name, &self.options, func)?;

        debug!(queue = %self.queue.name(), task = %name, "Task registered");
        Ok(TaskHandle {
            queue: Arc::clone(&self.queue),
            name,
        })
    }
}

/// Periodic task decorator bound to one queue client
#[derive(Clone)]
pub struct PeriodicTaskDecorator {
    queue: Arc<dyn QueueClient>,
    options: PeriodicOptions,
}

impl PeriodicTaskDecorator {
    pub fn new(queue: Arc<dyn QueueClient>, options: PeriodicOptions) -> Self {
        Self { queue, options }
    }

    pub fn queue(&self) -> &Arc<dyn QueueClient> {
        &self.queue
    }

    pub fn apply<F>(&self, name: &str, func: F) -> Result<TaskHandle>
    where
        F: Fn(Value) -> std::result::Result<Value, TaskError> + Send + Sync + 'static,
    {
        self.options.validate()?;

        let name = self.options.name.clone().unwrap_or_else(|| name.to_string());
        let func: TaskFn = Arc::new(func);
        self.queue.register_periodic_task(&name, &self.options, func)?;

        debug!(
            queue = %self.queue.name(),
            task = %name,
            every_secs = self.options.every_secs,
            "Periodic task registered"
        );
        Ok(TaskHandle {
            queue: Arc::clone(&self.queue),
            name,
        })
    }
}

/// Callable handle to a registered task
#[derive(Clone)]
pub struct TaskHandle {
    queue: Arc<dyn QueueClient>,
    name: String,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue_name(&self) -> &str {
        self.queue.name()
    }

    /// Invoke the task: inline when the queue is eager, queued otherwise
    pub fn call(&self, args: Value) -> Result<TaskOutcome> {
        self.queue.enqueue(&self.name, args)
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("queue", &self.queue.name())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueConfig;
    use crate::port::queue_backend::mocks::MockQueueClient;
    use serde_json::json;
    use std::time::Duration;

    fn client(always_eager: bool) -> Arc<dyn QueueClient> {
        let mut config = QueueConfig::new("q");
        config.always_eager = always_eager;
        Arc::new(MockQueueClient::new(config))
    }

    #[test]
    fn test_eager_call_runs_inline() {
        let handle = TaskDecorator::new(client(true), TaskOptions::default())
            .apply("sample_task", |_| Ok(json!("bla")))
            .unwrap();

        assert_eq!(handle.name(), "sample_task");
        assert_eq!(handle.queue_name(), "q");
        assert_eq!(
            handle.call(Value::Null).unwrap(),
            TaskOutcome::Completed { value: json!("bla") }
        );
    }

    #[test]
    fn test_lazy_call_is_enqueued() {
        let queue = client(false);
        let handle = TaskDecorator::new(Arc::clone(&queue), TaskOptions::default())
            .apply("sample_task", |_| Ok(json!("bla")))
            .unwrap();

        let outcome = handle.call(json!([1])).unwrap();
        assert!(outcome.task_id().is_some());
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_options_name_wins() {
        let handle = TaskDecorator::new(client(true), TaskOptions::named("renamed"))
            .apply("original", |args| Ok(args))
            .unwrap();
        assert_eq!(handle.name(), "renamed");
    }

    #[test]
    fn test_eager_task_error_propagates() {
        let handle = TaskDecorator::new(client(true), TaskOptions::default())
            .apply("boom", |_| Err(TaskError::new("boom")))
            .unwrap();
        assert!(handle.call(Value::Null).unwrap_err().to_string().contains("boom"));
    }

    #[test]
    fn test_periodic_registration() {
        let queue = client(false);
        let decorator =
            PeriodicTaskDecorator::new(Arc::clone(&queue), PeriodicOptions::every(Duration::from_secs(60)));
        decorator.apply("nightly", |_| Ok(Value::Null)).unwrap();
        assert_eq!(queue.registered_tasks(), vec!["nightly".to_string()]);

        let invalid = PeriodicTaskDecorator::new(queue, PeriodicOptions::every(Duration::ZERO));
        assert!(invalid.apply("never", |_| Ok(Value::Null)).is_err());
    }
}
