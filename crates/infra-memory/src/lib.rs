// Taskwire Infrastructure - In-process queue backend
// Implements: QueueBackend, QueueClient, Consumer

mod backend;
mod consumer;
mod logging;
mod panic_guard;
mod queue;

pub use backend::{MemoryBackend, MEMORY_BACKEND_ID};
pub use consumer::MemoryConsumer;
pub use logging::init_consumer_logging;
pub use queue::{MemoryQueue, PendingJob};
