// In-process queue client

use crate::panic_guard::run_guarded;
use serde_json::{Map, Value};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use taskwire_core::domain::{
    PeriodicOptions, QueueConfig, TaskFn, TaskId, TaskOptions, TaskOutcome,
};
use taskwire_core::error::{AppError, Result};
use taskwire_core::port::{IdProvider, QueueClient};
use tracing::{debug, info};

struct RegisteredTask {
    func: TaskFn,
    priority: i32,
}

struct PeriodicEntry {
    func: TaskFn,
    options: PeriodicOptions,
    next_run_millis: Option<i64>,
}

/// Queued invocation waiting for a worker
#[derive(Debug, Clone)]
pub struct PendingJob {
    pub id: TaskId,
    pub task: String,
    pub args: Value,
    pub priority: i32,
    seq: u64,
}

// Higher priority first, then FIFO
impl Ord for PendingJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingJob {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for PendingJob {}

/// Queue client keeping tasks and pending invocations in memory
pub struct MemoryQueue {
    config: QueueConfig,
    arguments: Map<String, Value>,
    id_provider: Arc<dyn IdProvider>,
    tasks: Mutex<BTreeMap<String, RegisteredTask>>,
    periodic: Mutex<BTreeMap<String, PeriodicEntry>>,
    pending: Mutex<BinaryHeap<PendingJob>>,
    seq: AtomicU64,
}

impl MemoryQueue {
    pub fn new(config: QueueConfig, id_provider: Arc<dyn IdProvider>) -> Self {
        Self {
            arguments: config.construction_arguments(),
            config,
            id_provider,
            tasks: Mutex::new(BTreeMap::new()),
            periodic: Mutex::new(BTreeMap::new()),
            pending: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Keyword arguments the queue was constructed with
    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Next invocation to run, highest priority first
    pub fn pop(&self) -> Option<PendingJob> {
        self.pending.lock().unwrap().pop()
    }

    /// Run a popped invocation
    pub fn execute(&self, job: &PendingJob) -> Result<Value> {
        let func = self.lookup(&job.task)?.0;
        Ok(run_guarded(&job.task, &func, job.args.clone())?)
    }

    /// Queue every periodic task whose interval has elapsed
    ///
    /// A task seen for the first time is scheduled one interval from `now`.
    pub fn enqueue_due_periodic(&self, now_millis: i64) -> usize {
        let mut due = Vec::new();
        {
            let mut periodic = self.periodic.lock().unwrap();
            for (name, entry) in periodic.iter_mut() {
                let interval_millis = entry.options.interval().as_millis() as i64;
                match entry.next_run_millis {
                    Some(next) if now_millis >= next => {
                        due.push((name.clone(), entry.options.priority));
                        entry.next_run_millis = Some(now_millis + interval_millis);
                    }
                    Some(_) => {}
                    None => entry.next_run_millis = Some(now_millis + interval_millis),
                }
            }
        }

        for (name, priority) in &due {
            let id = self.push(name, Value::Null, *priority);
            debug!(queue = %self.config.name, task = %name, task_id = %id, "Periodic task queued");
        }
        due.len()
    }

    fn lookup(&self, name: &str) -> Result<(TaskFn, i32)> {
        if let Some(task) = self.tasks.lock().unwrap().get(name) {
            return Ok((Arc::clone(&task.func), task.priority));
        }
        if let Some(entry) = self.periodic.lock().unwrap().get(name) {
            return Ok((Arc::clone(&entry.func), entry.options.priority));
        }
        Err(AppError::NotFound(format!(
            "task '{}' is not registered on queue '{}'",
            name, self.config.name
        )))
    }

    fn push(&self, task: &str, args: Value, priority: i32) -> TaskId {
        let id = self.id_provider.generate_id();
        let job = PendingJob {
            id: id.clone(),
            task: task.to_string(),
            args,
            priority,
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
        };
        self.pending.lock().unwrap().push(job);
        id
    }
}

impl QueueClient for MemoryQueue {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn always_eager(&self) -> bool {
        self.config.always_eager
    }

    fn register_task(&self, name: &str, options: &TaskOptions, func: TaskFn) -> Result<()> {
        let previous = self.tasks.lock().unwrap().insert(
            name.to_string(),
            RegisteredTask {
                func,
                priority: options.priority,
            },
        );
        if previous.is_some() {
            debug!(queue = %self.config.name, task = %name, "Task re-registered");
        }
        Ok(())
    }

    fn register_periodic_task(
        &self,
        name: &str,
        options: &PeriodicOptions,
        func: TaskFn,
    ) -> Result<()> {
        options.validate()?;
        self.periodic.lock().unwrap().insert(
            name.to_string(),
            PeriodicEntry {
                func,
                options: options.clone(),
                next_run_millis: None,
            },
        );
        Ok(())
    }

    fn enqueue(&self, name: &str, args: Value) -> Result<TaskOutcome> {
        let (func, priority) = self.lookup(name)?;

        if self.config.always_eager {
            let value = run_guarded(name, &func, args)?;
            return Ok(TaskOutcome::Completed { value });
        }

        let task_id = self.push(name, args, priority);
        info!(queue = %self.config.name, task = %name, task_id = %task_id, "Task queued");
        Ok(TaskOutcome::Enqueued { task_id })
    }

    fn registered_tasks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.lock().unwrap().keys().cloned().collect();
        names.extend(self.periodic.lock().unwrap().keys().cloned());
        names.sort();
        names
    }

    fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}
