// Taskwire Core - Settings resolution, queue registry & ports
// NO broker or subscriber dependencies: queue libraries plug in through port::QueueBackend

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{
    BackendCatalog, MultiQueueResolver, PeriodicTaskDecorator, QueueRegistry, QueueResolver,
    TaskDecorator, TaskHandle, TaskModule, CONFIGURATION_GUIDE,
};
pub use domain::{AmbientSettings, ConsumerConfig, ConsumerOverrides, QueueConfig, SettingsShape};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
