// Single-Queue Resolver - one queue's settings → queue client + consumer

use crate::application::BackendCatalog;
use crate::domain::settings::{is_legacy_shaped, is_truthy, type_name};
use crate::domain::{
    AmbientSettings, ConsumerConfig, ConsumerOptions, ConsumerOverrides, DomainError, QueueConfig,
};
use crate::error::Result;
use crate::port::{Consumer, QueueBackend, QueueClient};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const NAME_KEY: &str = "name";
pub const CONNECTION_KEY: &str = "connection";
pub const CONSUMER_KEY: &str = "consumer";
pub const DEFAULT_KEY: &str = "default";
pub const ALWAYS_EAGER_KEY: &str = "always_eager";

/// Resolves one queue's settings mapping
///
/// ```text
/// {
///     "name": "my-app",
///     "connection": {"host": "localhost", "port": 6379},
///     "consumer": {"workers": 4, "worker_type": "process"}
/// }
/// ```
///
/// The queue client and consumer are built lazily, at most once per
/// resolver, even under concurrent first access.
pub struct QueueResolver {
    settings: Map<String, Value>,
    overrides: ConsumerOverrides,
    ambient: AmbientSettings,
    catalog: Arc<BackendCatalog>,
    queue: OnceCell<Arc<dyn QueueClient>>,
    consumer: OnceCell<Arc<dyn Consumer>>,
}

impl QueueResolver {
    pub fn new(
        settings: Map<String, Value>,
        overrides: ConsumerOverrides,
        ambient: AmbientSettings,
        catalog: Arc<BackendCatalog>,
    ) -> Self {
        let mut settings = settings;
        // numeric and boolean names are used in their text form
        if let Some(name) = settings.get_mut(NAME_KEY) {
            if matches!(name, Value::Number(_) | Value::Bool(_)) {
                *name = Value::String(name.to_string());
            }
        }

        Self {
            settings,
            overrides,
            ambient,
            catalog,
            queue: OnceCell::new(),
            consumer: OnceCell::new(),
        }
    }

    /// Configured name, or `""` when the settings carry none
    ///
    /// The client may still be built under a derived name, see
    /// [`QueueResolver::resolved_queue_config`].
    pub fn name(&self) -> &str {
        self.settings
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    /// True iff at least one top-level value is not a mapping
    pub fn is_legacy_shaped(&self) -> bool {
        is_legacy_shaped(&self.settings)
    }

    /// True iff the settings carry a truthy `default` key
    pub fn is_default(&self) -> bool {
        self.settings.get(DEFAULT_KEY).map(is_truthy).unwrap_or(false)
    }

    /// Queue-construction settings
    ///
    /// `name`, `connection`, `consumer` and `default` are taken out of a
    /// working copy; what remains are extra constructor arguments.
    /// `always_eager` falls back to the host debug flag and the name to the
    /// database-derived default.
    pub fn resolved_queue_config(&self) -> Result<QueueConfig> {
        let mut working = self.settings.clone();

        let name = match working.remove(NAME_KEY) {
            Some(Value::String(name)) => name,
            None | Some(Value::Null) => self.ambient.default_queue_name(),
            Some(other) => {
                return Err(DomainError::InvalidSettings(format!(
                    "queue 'name' must be a string, got {}",
                    type_name(&other)
                ))
                .into())
            }
        };

        let connection = match working.remove(CONNECTION_KEY) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(connection)) => connection,
            Some(other) => {
                return Err(DomainError::InvalidSettings(format!(
                    "'connection' of queue '{}' must be a mapping, got {}",
                    name,
                    type_name(&other)
                ))
                .into())
            }
        };

        working.remove(CONSUMER_KEY);
        let is_default = working.remove(DEFAULT_KEY).map(|v| is_truthy(&v)).unwrap_or(false);

        let always_eager = working
            .remove(ALWAYS_EAGER_KEY)
            .map(|v| is_truthy(&v))
            .unwrap_or(self.ambient.debug);

        Ok(QueueConfig {
            name,
            connection,
            arguments: working,
            always_eager,
            is_default,
        })
    }

    /// Consumer options: declared `consumer` settings, then non-null overrides
    pub fn resolved_consumer_config(&self) -> Result<ConsumerOptions> {
        let declared = match self.settings.get(CONSUMER_KEY) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(consumer)) => consumer.clone(),
            Some(other) => {
                return Err(DomainError::InvalidSettings(format!(
                    "'consumer' of queue '{}' must be a mapping, got {}",
                    self.name(),
                    type_name(other)
                ))
                .into())
            }
        };

        Ok(ConsumerOptions::merge(&declared, &self.overrides))
    }

    /// Queue client, built on first access and shared afterwards
    pub fn queue_client(&self) -> Result<Arc<dyn QueueClient>> {
        self.queue
            .get_or_try_init(|| -> Result<Arc<dyn QueueClient>> {
                let config = self.resolved_queue_config()?;
                let backend = self.catalog.resolve(&config)?;
                let queue = backend.create_queue(&config)?;

                info!(
                    queue = %config.name,
                    backend = backend.id(),
                    always_eager = config.always_eager,
                    "Queue client created"
                );
                Ok(queue)
            })
            .map(Arc::clone)
    }

    /// Consumer, built on first access and shared afterwards
    ///
    /// # Errors
    /// - Domain(InvalidConsumerOption) if the merged options fail validation
    pub fn consumer(&self) -> Result<Arc<dyn Consumer>> {
        self.consumer
            .get_or_try_init(|| -> Result<Arc<dyn Consumer>> {
                let queue = self.queue_client()?;
                let options = self.resolved_consumer_config()?;
                let config = ConsumerConfig::from_options(&options)?;
                config.validate()?;

                let backend = self.backend()?;
                backend.setup_logger(&config.logging())?;
                let consumer = backend.create_consumer(Arc::clone(&queue), &config)?;

                info!(
                    queue = %queue.name(),
                    workers = config.workers,
                    worker_type = %config.worker_type,
                    "Consumer created"
                );
                Ok(consumer)
            })
            .map(Arc::clone)
    }

    /// Whether the queue client has been built yet
    pub fn is_realized(&self) -> bool {
        self.queue.get().is_some()
    }

    fn backend(&self) -> Result<Arc<dyn QueueBackend>> {
        let config = self.resolved_queue_config()?;
        debug!(queue = %config.name, backend = ?config.backend(), "Resolving backend");
        self.catalog.resolve(&config)
    }
}

impl std::fmt::Debug for QueueResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueResolver")
            .field("name", &self.name())
            .field("settings", &self.settings)
            .field("realized", &self.is_realized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WorkerType;
    use crate::error::AppError;
    use crate::port::queue_backend::mocks::MockBackend;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn myapp_settings() -> Map<String, Value> {
        map(json!({
            "name": "myapp",
            "connection": {"host": "localhost", "port": 6378},
            "consumer": {
                "workers": 4,
                "worker_type": "process",
            },
        }))
    }

    fn resolver_with(
        settings: Map<String, Value>,
        overrides: ConsumerOverrides,
        backend: Arc<MockBackend>,
    ) -> QueueResolver {
        QueueResolver::new(
            settings,
            overrides,
            AmbientSettings::new(false),
            Arc::new(BackendCatalog::single(backend)),
        )
    }

    fn resolver(settings: Map<String, Value>) -> QueueResolver {
        resolver_with(
            settings,
            ConsumerOverrides::new(),
            Arc::new(MockBackend::new("mock")),
        )
    }

    #[test]
    fn test_name() {
        assert_eq!(resolver(myapp_settings()).name(), "myapp");
        assert_eq!(resolver(map(json!({"connection": {}}))).name(), "");
    }

    #[test]
    fn test_is_default() {
        assert!(!resolver(myapp_settings()).is_default());
        assert!(resolver(map(json!({"default": true}))).is_default());
        assert!(!resolver(map(json!({"default": false}))).is_default());
    }

    #[test]
    fn test_resolved_queue_config() {
        let config = resolver(myapp_settings()).resolved_queue_config().unwrap();

        assert_eq!(config.name, "myapp");
        assert_eq!(config.connection_param("host"), Some(&json!("localhost")));
        assert_eq!(config.connection_param("port"), Some(&json!(6378)));
        assert!(!config.always_eager);
        assert!(config.arguments.is_empty());
    }

    #[test]
    fn test_queue_config_keeps_extra_arguments() {
        let settings = map(json!({
            "name": "q",
            "backend": "mock",
            "default": true,
            "consumer": {"workers": 2},
            "results": false,
        }));
        let config = resolver(settings).resolved_queue_config().unwrap();

        assert!(config.is_default);
        assert_eq!(config.arguments.get("backend"), Some(&json!("mock")));
        assert_eq!(config.arguments.get("results"), Some(&json!(false)));
        assert!(config.arguments.get("consumer").is_none());
        assert!(config.arguments.get("default").is_none());
    }

    #[test]
    fn test_always_eager_defaults_to_debug() {
        let debug_resolver = QueueResolver::new(
            map(json!({"name": "q"})),
            ConsumerOverrides::new(),
            AmbientSettings::new(true),
            Arc::new(BackendCatalog::new()),
        );
        assert!(debug_resolver.resolved_queue_config().unwrap().always_eager);

        let explicit = QueueResolver::new(
            map(json!({"name": "q", "always_eager": false})),
            ConsumerOverrides::new(),
            AmbientSettings::new(true),
            Arc::new(BackendCatalog::new()),
        );
        assert!(!explicit.resolved_queue_config().unwrap().always_eager);
    }

    #[test]
    fn test_missing_name_uses_database_name() {
        let resolver = QueueResolver::new(
            map(json!({"always_eager": true})),
            ConsumerOverrides::new(),
            AmbientSettings::new(false).with_database_name("appdb"),
            Arc::new(BackendCatalog::new()),
        );

        // Lookup name and construction name diverge
        assert_eq!(resolver.name(), "");
        assert_eq!(resolver.resolved_queue_config().unwrap().name, "appdb");
    }

    #[test]
    fn test_scalar_name_is_used_as_text() {
        let backend = Arc::new(MockBackend::new("mock"));
        let numeric = resolver_with(
            map(json!({"name": 42})),
            ConsumerOverrides::new(),
            backend.clone(),
        );

        assert_eq!(numeric.name(), "42");
        assert_eq!(numeric.resolved_queue_config().unwrap().name, "42");
        assert_eq!(numeric.queue_client().unwrap().name(), "42");
        assert_eq!(resolver(map(json!({"name": true}))).name(), "true");
    }

    #[test]
    fn test_structured_name_is_rejected() {
        let err = resolver(map(json!({"name": ["a", "b"]})))
            .resolved_queue_config()
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_connection_must_be_mapping() {
        let err = resolver(map(json!({"name": "q", "connection": "redis://"})))
            .resolved_queue_config()
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_resolved_consumer_config() {
        let options = resolver(myapp_settings()).resolved_consumer_config().unwrap();
        assert_eq!(options.get("workers"), Some(&json!(4)));
        assert_eq!(options.get("worker_type"), Some(&json!("process")));
    }

    #[test]
    fn test_consumer_overrides_win_unless_null() {
        let overrides = ConsumerOverrides::new()
            .set("workers", 2)
            .set("worker_type", Value::Null)
            .set("huey_verbose", true);
        let resolver = resolver_with(myapp_settings(), overrides, Arc::new(MockBackend::new("m")));

        let options = resolver.resolved_consumer_config().unwrap();
        assert_eq!(options.get("workers"), Some(&json!(2)));
        assert_eq!(options.get("worker_type"), Some(&json!("process")));
        assert_eq!(options.get("verbose"), Some(&json!(true)));
    }

    #[test]
    fn test_queue_client_is_built_once() {
        let backend = Arc::new(MockBackend::new("mock"));
        let resolver = resolver_with(myapp_settings(), ConsumerOverrides::new(), backend.clone());
        assert!(!resolver.is_realized());

        let first = resolver.queue_client().unwrap();
        let second = resolver.queue_client().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "myapp");
        assert_eq!(backend.queues_created(), 1);
        assert!(resolver.is_realized());
    }

    #[test]
    fn test_consumer_is_built_once() {
        let backend = Arc::new(MockBackend::new("mock"));
        let resolver = resolver_with(myapp_settings(), ConsumerOverrides::new(), backend.clone());

        let first = resolver.consumer().unwrap();
        let second = resolver.consumer().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.queue(), &resolver.queue_client().unwrap()));
        assert_eq!(first.config().workers, 4);
        assert_eq!(first.config().worker_type, WorkerType::Process);
        assert_eq!(backend.consumers_created(), 1);
        assert_eq!(backend.loggers_configured(), 1);
        assert_eq!(backend.queues_created(), 1);
    }

    #[test]
    fn test_consumer_validation_error_propagates() {
        let settings = map(json!({"name": "q", "consumer": {"scheduler_interval": 7}}));
        let backend = Arc::new(MockBackend::new("mock"));
        let resolver = resolver_with(settings, ConsumerOverrides::new(), backend.clone());

        let err = resolver.consumer().err().unwrap();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidConsumerOption(_))
        ));
        assert_eq!(backend.consumers_created(), 0);
    }

    #[test]
    fn test_concurrent_first_access_builds_once() {
        let backend = Arc::new(MockBackend::new("mock"));
        let resolver = Arc::new(resolver_with(
            myapp_settings(),
            ConsumerOverrides::new(),
            backend.clone(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.queue_client().unwrap())
            })
            .collect();
        let clients: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(backend.queues_created(), 1);
        assert!(clients.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_concurrent_first_consumer_access_builds_once() {
        let backend = Arc::new(MockBackend::new("mock"));
        let resolver = Arc::new(resolver_with(
            myapp_settings(),
            ConsumerOverrides::new(),
            backend.clone(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.consumer().unwrap())
            })
            .collect();
        let consumers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(consumers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(backend.consumers_created(), 1);
        assert_eq!(backend.loggers_configured(), 1);
        assert_eq!(backend.queues_created(), 1);
    }
}
