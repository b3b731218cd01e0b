// Tasks every consumer installs

use serde_json::{json, Value};
use taskwire_core::domain::TaskOptions;
use taskwire_core::{QueueRegistry, Result, TaskModule};

/// `ping` on every configured queue, for smoke-testing a deployment
pub struct HealthTasks;

impl TaskModule for HealthTasks {
    fn name(&self) -> &str {
        "health"
    }

    fn register(&self, registry: &QueueRegistry) -> Result<bool> {
        let names = registry.queue_names()?;
        for name in &names {
            registry
                .task(Some(name), TaskOptions::named("ping"))?
                .apply("ping", |args: Value| Ok(json!({"pong": args})))?;
        }
        Ok(!names.is_empty())
    }
}
