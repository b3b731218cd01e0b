// Queue Backend Port - the wrapped task-queue library
// Core only ever constructs clients/consumers through these traits

use crate::domain::{
    ConsumerConfig, LoggingConfig, PeriodicOptions, QueueConfig, TaskFn, TaskOptions, TaskOutcome,
};
use crate::error::Result;
use crate::port::shutdown::ShutdownToken;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Factory for queue clients and consumers
///
/// Implementations:
/// - MemoryBackend: in-process queue (taskwire-infra-memory)
/// - mocks::MockBackend: counts constructions (tests)
pub trait QueueBackend: Send + Sync {
    /// Catalog id (matched against the `backend` settings key)
    fn id(&self) -> &str;

    /// Construct a queue client from resolved queue settings
    fn create_queue(&self, config: &QueueConfig) -> Result<Arc<dyn QueueClient>>;

    /// Configure consumer-side logging before a consumer is built
    fn setup_logger(&self, _logging: &LoggingConfig) -> Result<()> {
        Ok(())
    }

    /// Construct a consumer bound to `queue`
    ///
    /// `config` has already been validated.
    fn create_consumer(
        &self,
        queue: Arc<dyn QueueClient>,
        config: &ConsumerConfig,
    ) -> Result<Arc<dyn Consumer>>;
}

/// Handle to one named task queue
pub trait QueueClient: Send + Sync {
    fn name(&self) -> &str;

    /// Invocations run in-process instead of being queued
    fn always_eager(&self) -> bool;

    /// Register (or replace) an on-demand task
    fn register_task(&self, name: &str, options: &TaskOptions, func: TaskFn) -> Result<()>;

    /// Register (or replace) a periodic task
    fn register_periodic_task(
        &self,
        name: &str,
        options: &PeriodicOptions,
        func: TaskFn,
    ) -> Result<()>;

    /// Invoke a registered task
    ///
    /// # Errors
    /// - AppError::NotFound if no task is registered under `name`
    /// - AppError::Task if an eager invocation fails
    fn enqueue(&self, name: &str, args: Value) -> Result<TaskOutcome>;

    /// Names of registered tasks (on-demand and periodic), sorted
    fn registered_tasks(&self) -> Vec<String>;

    /// Number of queued, not yet executed invocations
    fn pending(&self) -> usize;
}

/// Worker supervisor bound to one queue client
#[async_trait]
pub trait Consumer: Send + Sync {
    fn queue(&self) -> Arc<dyn QueueClient>;

    fn config(&self) -> &ConsumerConfig;

    /// Blocking run loop; returns once `shutdown` fires
    async fn run(&self, shutdown: ShutdownToken) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock backend counting how often clients/consumers are built
    pub struct MockBackend {
        id: String,
        queues_created: AtomicUsize,
        consumers_created: AtomicUsize,
        loggers_configured: AtomicUsize,
    }

    impl MockBackend {
        pub fn new(id: impl Into<String>) -> Self {
            Self {
                id: id.into(),
                queues_created: AtomicUsize::new(0),
                consumers_created: AtomicUsize::new(0),
                loggers_configured: AtomicUsize::new(0),
            }
        }
        pub fn queues_created(&self) -> usize {
            self.queues_created.load(Ordering::SeqCst)
        }
        pub fn consumers_created(&self) -> usize {
            self.consumers_created.load(Ordering::SeqCst)
        }
        pub fn loggers_configured(&self) -> usize {
            self.loggers_configured.load(Ordering::SeqCst)
        }
    }

    impl QueueBackend for MockBackend {
        fn id(&self) -> &str {
            &self.id
        }
        fn create_queue(&self, config: &QueueConfig) -> Result<Arc<dyn QueueClient>> {
            self.queues_created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockQueueClient::new(config.clone())))
        }
        fn setup_logger(&self, _logging: &LoggingConfig) -> Result<()> {
            self.loggers_configured.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn create_consumer(
            &self,
            queue: Arc<dyn QueueClient>,
            config: &ConsumerConfig,
        ) -> Result<Arc<dyn Consumer>> {
            self.consumers_created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockConsumer {
                queue,
                config: config.clone(),
            }))
        }
    }

    /// Mock queue client: eager invocations run inline, others are recorded
    pub struct MockQueueClient {
        config: QueueConfig,
        tasks: Mutex<BTreeMap<String, TaskFn>>,
        periodic: Mutex<BTreeSet<String>>,
        queued: Mutex<Vec<(String, Value)>>,
    }

    impl MockQueueClient {
        pub fn new(config: QueueConfig) -> Self {
            Self {
                config,
                tasks: Mutex::new(BTreeMap::new()),
                periodic: Mutex::new(BTreeSet::new()),
                queued: Mutex::new(Vec::new()),
            }
        }
        /// Settings the client was built from
        pub fn config(&self) -> &QueueConfig {
            &self.config
        }
    }

    impl QueueClient for MockQueueClient {
        fn name(&self) -> &str {
            &self.config.name
        }
        fn always_eager(&self) -> bool {
            self.config.always_eager
        }
        fn register_task(&self, name: &str, _options: &TaskOptions, func: TaskFn) -> Result<()> {
            self.tasks.lock().unwrap().insert(name.to_string(), func);
            Ok(())
        }
        fn register_periodic_task(
            &self,
            name: &str,
            options: &PeriodicOptions,
            func: TaskFn,
        ) -> Result<()> {
            options.validate()?;
            self.periodic.lock().unwrap().insert(name.to_string());
            self.tasks.lock().unwrap().insert(name.to_string(), func);
            Ok(())
        }
        fn enqueue(&self, name: &str, args: Value) -> Result<TaskOutcome> {
            let func = self
                .tasks
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("task '{}'", name)))?;

            if self.config.always_eager {
                let value = func(args)?;
                return Ok(TaskOutcome::Completed { value });
            }

            let mut queued = self.queued.lock().unwrap();
            queued.push((name.to_string(), args));
            Ok(TaskOutcome::Enqueued {
                task_id: format!("mock-{}", queued.len()),
            })
        }
        fn registered_tasks(&self) -> Vec<String> {
            self.tasks.lock().unwrap().keys().cloned().collect()
        }
        fn pending(&self) -> usize {
            self.queued.lock().unwrap().len()
        }
    }

    /// Mock consumer: idles until shutdown
    pub struct MockConsumer {
        queue: Arc<dyn QueueClient>,
        config: ConsumerConfig,
    }

    #[async_trait]
    impl Consumer for MockConsumer {
        fn queue(&self) -> Arc<dyn QueueClient> {
            Arc::clone(&self.queue)
        }
        fn config(&self) -> &ConsumerConfig {
            &self.config
        }
        async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
            if !shutdown.is_shutdown() {
                shutdown.wait().await;
            }
            Ok(())
        }
    }
}
