// Application Layer - Resolvers, registry & task decorators

pub mod catalog;
pub mod decorator;
pub mod guide;
pub mod module;
pub mod multi;
pub mod registry;
pub mod resolver;

// Re-exports
pub use catalog::BackendCatalog;
pub use decorator::{PeriodicTaskDecorator, TaskDecorator, TaskHandle};
pub use guide::{config_error_report, CONFIGURATION_GUIDE};
pub use module::TaskModule;
pub use multi::MultiQueueResolver;
pub use registry::QueueRegistry;
pub use resolver::QueueResolver;
