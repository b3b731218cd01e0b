// Panic isolation for task bodies
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use taskwire_core::domain::{TaskError, TaskFn};
use tracing::error;

/// Run a task body, turning a panic into a `TaskError`
///
/// A panicking task must not take its worker (or an eager caller) down.
pub fn run_guarded(task: &str, func: &TaskFn, args: Value) -> Result<Value, TaskError> {
    match catch_unwind(AssertUnwindSafe(|| func(args))) {
        Ok(result) => result,
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };

            error!(task = %task, panic_msg = %panic_msg, "Task panicked");
            Err(TaskError::new(format!("task '{}' panicked: {}", task, panic_msg)))
        }
    }
}
