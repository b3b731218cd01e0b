// MemoryBackend - QueueBackend for in-process queues

use crate::consumer::MemoryConsumer;
use crate::logging::init_consumer_logging;
use crate::queue::MemoryQueue;
use std::sync::{Arc, Mutex, Weak};
use taskwire_core::domain::{ConsumerConfig, LoggingConfig, QueueConfig};
use taskwire_core::error::{AppError, Result};
use taskwire_core::port::{
    Consumer, IdProvider, QueueBackend, QueueClient, SystemTimeProvider, TimeProvider, UuidProvider,
};
use tracing::info;

/// Catalog id selecting this backend (`backend = "memory"`)
pub const MEMORY_BACKEND_ID: &str = "memory";

pub struct MemoryBackend {
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    created: Mutex<Vec<Weak<MemoryQueue>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_providers(Arc::new(UuidProvider), Arc::new(SystemTimeProvider))
    }

    /// Backend with injected id and clock sources (deterministic tests)
    pub fn with_providers(
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            id_provider,
            time_provider,
            created: Mutex::new(Vec::new()),
        }
    }

    // Consumers need the concrete queue; only clients built here qualify
    fn find_queue(&self, queue: &Arc<dyn QueueClient>) -> Option<Arc<MemoryQueue>> {
        let target = Arc::as_ptr(queue) as *const ();
        let mut created = self.created.lock().unwrap();
        created.retain(|weak| weak.strong_count() > 0);
        created
            .iter()
            .filter_map(Weak::upgrade)
            .find(|candidate| Arc::as_ptr(candidate) as *const () == target)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueBackend for MemoryBackend {
    fn id(&self) -> &str {
        MEMORY_BACKEND_ID
    }

    fn create_queue(&self, config: &QueueConfig) -> Result<Arc<dyn QueueClient>> {
        let queue = Arc::new(MemoryQueue::new(config.clone(), Arc::clone(&self.id_provider)));
        self.created.lock().unwrap().push(Arc::downgrade(&queue));

        info!(
            queue = %config.name,
            always_eager = config.always_eager,
            arguments = ?queue.arguments().keys().collect::<Vec<_>>(),
            "In-memory queue created"
        );
        Ok(queue)
    }

    fn setup_logger(&self, logging: &LoggingConfig) -> Result<()> {
        init_consumer_logging(logging).map(|_| ())
    }

    fn create_consumer(
        &self,
        queue: Arc<dyn QueueClient>,
        config: &ConsumerConfig,
    ) -> Result<Arc<dyn Consumer>> {
        let memory_queue = self.find_queue(&queue).ok_or_else(|| {
            AppError::Config(format!(
                "queue '{}' was not created by the '{}' backend",
                queue.name(),
                MEMORY_BACKEND_ID
            ))
        })?;

        Ok(Arc::new(MemoryConsumer::new(
            memory_queue,
            config.clone(),
            Arc::clone(&self.time_provider),
        )))
    }
}
