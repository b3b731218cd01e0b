// Task Modules - units of task registration discovered at consumer startup

use crate::application::QueueRegistry;
use crate::error::Result;

/// A group of tasks an application installs into the registry
///
/// The consumer command calls [`QueueRegistry::autodiscover`] with every
/// installed module before it starts consuming, so workers know every task
/// they may be asked to run.
pub trait TaskModule: Send + Sync {
    fn name(&self) -> &str;

    /// Register tasks; `Ok(false)` means the module has none
    fn register(&self, registry: &QueueRegistry) -> Result<bool>;
}
