// Domain Layer - Settings, resolved configs and task types

pub mod consumer;
pub mod error;
pub mod queue;
pub mod settings;
pub mod task;

// Re-exports
pub use consumer::{ConsumerConfig, ConsumerOptions, ConsumerOverrides, LoggingConfig, WorkerType};
pub use error::DomainError;
pub use queue::QueueConfig;
pub use settings::{AmbientSettings, SettingsShape, FALLBACK_QUEUE_NAME};
pub use task::{PeriodicOptions, TaskError, TaskFn, TaskId, TaskOptions, TaskOutcome};
