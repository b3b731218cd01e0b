// Port Layer - Interfaces for the wrapped queue library

pub mod id_provider; // For deterministic testing
pub mod queue_backend;
pub mod shutdown;
pub mod time_provider;

// Re-exports
pub use id_provider::{IdProvider, SequentialIdProvider, UuidProvider};
pub use queue_backend::{Consumer, QueueBackend, QueueClient};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use time_provider::{ManualClock, SystemTimeProvider, TimeProvider};
