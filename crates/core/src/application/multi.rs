// Multi-Queue Resolver - named queues, one QueueResolver each

use crate::application::{BackendCatalog, QueueResolver};
use crate::domain::settings::is_modern_shaped;
use crate::domain::{AmbientSettings, ConsumerOverrides};
use crate::error::{AppError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

use super::resolver::NAME_KEY;

/// Resolves a mapping of queue name → single-queue settings
///
/// ```text
/// {
///     "my-app":  {"default": true, "connection": {"host": "localhost"}},
///     "my-app2": {"backend": "sqlite", "connection": {"location": "tasks.db"}}
/// }
/// ```
///
/// `default` marks the queue used when a task names no queue. The first
/// marked queue wins; with none marked, the first queue is the default.
pub struct MultiQueueResolver {
    settings: Map<String, Value>,
    resolvers: Vec<Arc<QueueResolver>>,
    default_index: Option<usize>,
}

impl MultiQueueResolver {
    pub fn new(
        settings: Map<String, Value>,
        overrides: &ConsumerOverrides,
        ambient: &AmbientSettings,
        catalog: Arc<BackendCatalog>,
    ) -> Self {
        let mut resolvers = Vec::with_capacity(settings.len());
        let mut default_index = None;

        for (name, config) in &settings {
            let Some(inner) = config.as_object() else {
                warn!(queue = %name, "Skipping queue whose settings are not a mapping");
                continue;
            };

            // The outer key is the queue name
            let mut inner = inner.clone();
            inner.insert(NAME_KEY.to_string(), Value::String(name.clone()));

            let resolver = QueueResolver::new(
                inner,
                overrides.clone(),
                ambient.clone(),
                Arc::clone(&catalog),
            );
            if default_index.is_none() && resolver.is_default() {
                default_index = Some(resolvers.len());
            }
            resolvers.push(Arc::new(resolver));
        }

        Self {
            settings,
            resolvers,
            default_index,
        }
    }

    /// True iff every top-level value is a mapping
    pub fn is_valid(&self) -> bool {
        is_modern_shaped(&self.settings)
    }

    /// Resolvers in settings order
    pub fn configurations(&self) -> &[Arc<QueueResolver>] {
        &self.resolvers
    }

    /// # Errors
    /// - AppError::NotFound if no queue is configured under `name`
    pub fn lookup(&self, name: &str) -> Result<Arc<QueueResolver>> {
        self.resolvers
            .iter()
            .find(|resolver| resolver.name() == name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("queue '{}' is not configured", name)))
    }

    /// The marked default queue, else the first one
    ///
    /// # Errors
    /// - AppError::Config if no queue is configured at all
    pub fn default_configuration(&self) -> Result<Arc<QueueResolver>> {
        self.default_index
            .or_else(|| (!self.resolvers.is_empty()).then_some(0))
            .map(|index| Arc::clone(&self.resolvers[index]))
            .ok_or_else(|| AppError::Config("no queues configured".to_string()))
    }
}
