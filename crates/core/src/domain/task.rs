// Task Domain Model - registration options & invocation outcomes

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Task invocation ID (UUID v4 for queued invocations)
pub type TaskId = String;

/// Error raised by a task body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TaskError(pub String);

impl TaskError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Registered task body: JSON arguments in, JSON result out
pub type TaskFn = Arc<dyn Fn(Value) -> std::result::Result<Value, TaskError> + Send + Sync>;

/// Options accepted by the task decorator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Registered name; defaults to the name given when applying the decorator
    #[serde(default)]
    pub name: Option<String>,

    /// Higher runs first among pending invocations
    #[serde(default)]
    pub priority: i32,
}

impl TaskOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Options accepted by the periodic-task decorator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicOptions {
    #[serde(default)]
    pub name: Option<String>,

    /// Run every `every_secs` seconds
    pub every_secs: u64,

    #[serde(default)]
    pub priority: i32,
}

impl PeriodicOptions {
    pub fn every(interval: Duration) -> Self {
        Self {
            name: None,
            every_secs: interval.as_secs(),
            priority: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.every_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.every_secs == 0 {
            return Err(DomainError::InvalidTaskOptions(
                "periodic tasks need an interval of at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of invoking a registered task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Ran in-process (eager mode)
    Completed { value: Value },
    /// Handed to the queue for a consumer
    Enqueued { task_id: TaskId },
}

impl TaskOutcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            TaskOutcome::Completed { value } => Some(value),
            TaskOutcome::Enqueued { .. } => None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            TaskOutcome::Completed { .. } => None,
            TaskOutcome::Enqueued { task_id } => Some(task_id),
        }
    }
}
