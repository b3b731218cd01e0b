// Queue Registry - named queue clients, the default queue & task routing

use crate::application::{
    BackendCatalog, MultiQueueResolver, PeriodicTaskDecorator, QueueResolver, TaskDecorator,
    TaskModule,
};
use crate::domain::{
    AmbientSettings, ConsumerOverrides, PeriodicOptions, SettingsShape, TaskOptions,
};
use crate::error::{AppError, Result};
use crate::port::{Consumer, QueueClient};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::resolver::NAME_KEY;

/// Started registry contents
struct Started {
    /// (lookup name, resolver) in settings order
    entries: Vec<(String, Arc<QueueResolver>)>,
    default: Arc<QueueResolver>,
}

/// Registry of named queue clients
///
/// Unstarted until [`QueueRegistry::start`] succeeds; every lookup and
/// task registration before that is an `InvalidState` error.
pub struct QueueRegistry {
    shape: SettingsShape,
    overrides: ConsumerOverrides,
    ambient: AmbientSettings,
    catalog: Arc<BackendCatalog>,
    started: OnceCell<Started>,
}

impl QueueRegistry {
    /// Classify `settings` and prepare an unstarted registry
    ///
    /// # Errors
    /// - Domain(InvalidSettings) if `settings` is present but not a mapping
    pub fn new(
        settings: Option<&Value>,
        overrides: ConsumerOverrides,
        ambient: AmbientSettings,
        catalog: BackendCatalog,
    ) -> Result<Self> {
        let shape = SettingsShape::classify(settings)?;
        Ok(Self {
            shape,
            overrides,
            ambient,
            catalog: Arc::new(catalog),
            started: OnceCell::new(),
        })
    }

    pub fn shape(&self) -> &SettingsShape {
        &self.shape
    }

    pub fn is_started(&self) -> bool {
        self.started.get().is_some()
    }

    /// Build every configured queue client and pick the default
    ///
    /// Safe to call again: later calls return without rebuilding anything.
    ///
    /// # Errors
    /// - AppError::MissingBackend if no settings are given and no default
    ///   backend exists (callers treat this as fatal)
    /// - any error from building a queue client
    pub fn start(&self) -> Result<()> {
        if self.is_started() {
            debug!("Queue registry already started");
            return Ok(());
        }

        self.started.get_or_try_init(|| self.build()).map(|started| {
            info!(
                queues = started.entries.len(),
                default = %started.default.name(),
                "Queue registry started"
            );
        })
    }

    fn build(&self) -> Result<Started> {
        let (entries, default) = match &self.shape {
            SettingsShape::Unset => {
                let name = self.ambient.default_queue_name();
                debug!(queue = %name, "No queue settings, using default queue");

                let mut settings = Map::new();
                settings.insert(NAME_KEY.to_string(), Value::String(name.clone()));
                let resolver = Arc::new(self.resolver(settings));
                (vec![(name, Arc::clone(&resolver))], resolver)
            }
            SettingsShape::Legacy(settings) => {
                let resolver = Arc::new(self.resolver(settings.clone()));
                let name = resolver.name().to_string();
                (vec![(name, Arc::clone(&resolver))], resolver)
            }
            SettingsShape::Modern(settings) => {
                let multi = MultiQueueResolver::new(
                    settings.clone(),
                    &self.overrides,
                    &self.ambient,
                    Arc::clone(&self.catalog),
                );
                let default = multi.default_configuration()?;
                let entries = multi
                    .configurations()
                    .iter()
                    .map(|resolver| (resolver.name().to_string(), Arc::clone(resolver)))
                    .collect();
                (entries, default)
            }
        };

        for (_, resolver) in &entries {
            resolver.queue_client()?;
        }

        Ok(Started { entries, default })
    }

    fn resolver(&self, settings: Map<String, Value>) -> QueueResolver {
        QueueResolver::new(
            settings,
            self.overrides.clone(),
            self.ambient.clone(),
            Arc::clone(&self.catalog),
        )
    }

    fn state(&self) -> Result<&Started> {
        self.started.get().ok_or_else(|| {
            AppError::InvalidState("queue registry used before start()".to_string())
        })
    }

    /// Queue names in settings order
    pub fn queue_names(&self) -> Result<Vec<String>> {
        Ok(self.state()?.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    pub fn default_resolver(&self) -> Result<Arc<QueueResolver>> {
        Ok(Arc::clone(&self.state()?.default))
    }

    /// # Errors
    /// - AppError::NotFound for an unknown queue name
    pub fn resolver_for(&self, name: &str) -> Result<Arc<QueueResolver>> {
        self.state()?
            .entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, resolver)| Arc::clone(resolver))
            .ok_or_else(|| AppError::NotFound(format!("queue '{}' is not configured", name)))
    }

    pub fn default_client(&self) -> Result<Arc<dyn QueueClient>> {
        self.default_resolver()?.queue_client()
    }

    pub fn client(&self, name: &str) -> Result<Arc<dyn QueueClient>> {
        self.resolver_for(name)?.queue_client()
    }

    /// All queue clients keyed by lookup name, in settings order
    pub fn clients(&self) -> Result<Vec<(String, Arc<dyn QueueClient>)>> {
        self.state()?
            .entries
            .iter()
            .map(|(name, resolver)| Ok((name.clone(), resolver.queue_client()?)))
            .collect()
    }

    /// Consumer of the default queue
    pub fn consumer(&self) -> Result<Arc<dyn Consumer>> {
        self.default_resolver()?.consumer()
    }

    pub fn consumer_for(&self, name: &str) -> Result<Arc<dyn Consumer>> {
        self.resolver_for(name)?.consumer()
    }

    /// Task decorator for `queue_name`, or the default queue when `None`
    pub fn task(&self, queue_name: Option<&str>, options: TaskOptions) -> Result<TaskDecorator> {
        let queue = match queue_name {
            Some(name) => self.client(name)?,
            None => self.default_client()?,
        };
        Ok(TaskDecorator::new(queue, options))
    }

    /// Periodic task decorator; the queue must be named explicitly
    ///
    /// # Errors
    /// - AppError::NotFound when `queue_name` is `None` or unknown
    pub fn periodic_task(
        &self,
        queue_name: Option<&str>,
        options: PeriodicOptions,
    ) -> Result<PeriodicTaskDecorator> {
        self.state()?;
        let name = queue_name.ok_or_else(|| {
            AppError::NotFound("periodic tasks need an explicit queue name".to_string())
        })?;
        Ok(PeriodicTaskDecorator::new(self.client(name)?, options))
    }

    /// Let each installed task module register its tasks
    ///
    /// Returns how many modules registered something.
    pub fn autodiscover(&self, modules: &[Arc<dyn TaskModule>]) -> Result<usize> {
        self.state()?;
        let mut registered = 0;
        for module in modules {
            if module.register(self)? {
                debug!(module = module.name(), "Task module registered");
                registered += 1;
            } else {
                debug!(module = module.name(), "Task module has no tasks");
            }
        }
        Ok(registered)
    }
}
