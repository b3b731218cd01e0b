// Backend Catalog - which queue library builds which queue

use crate::domain::QueueConfig;
use crate::error::{AppError, Result};
use crate::port::QueueBackend;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registered queue backends keyed by id, plus the default one
#[derive(Clone, Default)]
pub struct BackendCatalog {
    backends: BTreeMap<String, Arc<dyn QueueBackend>>,
    default_id: Option<String>,
}

impl BackendCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding one backend, which is also the default
    pub fn single(backend: Arc<dyn QueueBackend>) -> Self {
        let id = backend.id().to_string();
        Self::new().register(backend).with_default(id)
    }

    /// Add (or replace) a backend under its own id
    pub fn register(mut self, backend: Arc<dyn QueueBackend>) -> Self {
        self.backends.insert(backend.id().to_string(), backend);
        self
    }

    pub fn with_default(mut self, id: impl Into<String>) -> Self {
        self.default_id = Some(id.into());
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn QueueBackend>> {
        self.backends.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// Backend used when the settings do not name one
    ///
    /// # Errors
    /// - AppError::MissingBackend if no default is registered (fatal at startup)
    pub fn default_backend(&self) -> Result<Arc<dyn QueueBackend>> {
        let id = self.default_id.as_deref().ok_or_else(|| {
            AppError::MissingBackend("no default queue backend is registered".to_string())
        })?;

        self.get(id).ok_or_else(|| {
            AppError::MissingBackend(format!("default queue backend '{}' is not available", id))
        })
    }

    /// Backend for a resolved queue: its `backend` argument, else the default
    pub fn resolve(&self, config: &QueueConfig) -> Result<Arc<dyn QueueBackend>> {
        match config.backend() {
            Some(id) => self.get(id).ok_or_else(|| {
                AppError::Config(format!(
                    "queue '{}' requests unknown backend '{}' (available: {})",
                    config.name,
                    id,
                    self.ids().join(", ")
                ))
            }),
            None => self.default_backend(),
        }
    }
}

impl std::fmt::Debug for BackendCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCatalog")
            .field("backends", &self.ids())
            .field("default_id", &self.default_id)
            .finish()
    }
}
