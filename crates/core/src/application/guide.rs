// Configuration guide printed when the queue setup cannot start

/// Long-form help for configuring queues
pub const CONFIGURATION_GUIDE: &str = r#"
Configuring Taskwire queues
===========================

With no `queues` setting at all, a single queue named after the host
database (or "huey") is created on the default backend.

Multiple named queues. `default = true` marks the queue used when a task
does not name one; without it, the first queue is the default:

    [queues.my-app]
    default = true
    backend = "memory"
    connection = { host = "localhost", port = 6379 }
    consumer = { workers = 4, worker_type = "process" }

    [queues.my-app2]
    backend = "memory"
    connection = { location = "tasks.db" }
    consumer = { workers = 4, worker_type = "process" }

The single-queue form is still accepted:

    [queues]
    name = "my-app"
    connection = { host = "localhost", port = 6379 }
    consumer = { workers = 4, worker_type = "process" }

`always_eager` runs tasks in-process instead of queueing them; it defaults
to the `debug` setting. Consumer log output goes through `tracing`; set
RUST_LOG or the consumer `verbose` / `logfile` options to tune it.
"#;

/// Guide followed by the startup error
pub fn config_error_report(msg: &str) -> String {
    format!("{}\n\n{}", CONFIGURATION_GUIDE, msg)
}
