// MemoryConsumer - worker supervisor for an in-process queue

use crate::queue::{MemoryQueue, PendingJob};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use taskwire_core::domain::{ConsumerConfig, WorkerType};
use taskwire_core::error::Result;
use taskwire_core::port::{Consumer, QueueClient, ShutdownToken, TimeProvider};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

const FALLBACK_INITIAL_DELAY: Duration = Duration::from_millis(100);
const FALLBACK_MAX_DELAY: Duration = Duration::from_secs(10);

/// Per-worker copy of the polling settings
#[derive(Clone)]
struct WorkerContext {
    queue: Arc<MemoryQueue>,
    worker_type: WorkerType,
    initial_delay: Duration,
    max_delay: Duration,
    backoff: f64,
}

pub struct MemoryConsumer {
    queue: Arc<MemoryQueue>,
    config: ConsumerConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl MemoryConsumer {
    pub fn new(
        queue: Arc<MemoryQueue>,
        config: ConsumerConfig,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue,
            config,
            time_provider,
        }
    }

    /// Queue the periodic tasks that are due now
    pub fn tick_scheduler(&self) -> usize {
        enqueue_due(&self.queue, self.time_provider.as_ref())
    }

    fn worker_context(&self) -> WorkerContext {
        let initial_delay =
            Duration::try_from_secs_f64(self.config.initial_delay).unwrap_or(FALLBACK_INITIAL_DELAY);
        let max_delay = Duration::try_from_secs_f64(self.config.max_delay)
            .unwrap_or(FALLBACK_MAX_DELAY)
            .max(initial_delay);

        WorkerContext {
            queue: Arc::clone(&self.queue),
            worker_type: self.config.worker_type,
            initial_delay,
            max_delay,
            backoff: self.config.backoff.max(1.0),
        }
    }

    fn spawn_worker(&self, worker_id: usize, shutdown: ShutdownToken) -> JoinHandle<()> {
        let ctx = self.worker_context();
        tokio::spawn(async move { worker_loop(worker_id, ctx, shutdown).await })
    }

    fn spawn_scheduler(&self, mut shutdown: ShutdownToken) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let clock = Arc::clone(&self.time_provider);
        let period = Duration::from_secs(self.config.scheduler_interval.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                let stop = tokio::select! {
                    _ = ticker.tick() => false,
                    _ = shutdown.wait() => true,
                };
                if stop {
                    break;
                }
                enqueue_due(&queue, clock.as_ref());
            }
            debug!(queue = %queue.name(), "Scheduler stopped");
        })
    }
}

fn enqueue_due(queue: &MemoryQueue, clock: &dyn TimeProvider) -> usize {
    let queued = queue.enqueue_due_periodic(clock.now_millis());
    if queued > 0 {
        debug!(queue = %queue.name(), queued, "Scheduler queued periodic tasks");
    }
    queued
}

async fn worker_loop(worker_id: usize, ctx: WorkerContext, mut shutdown: ShutdownToken) {
    debug!(queue = %ctx.queue.name(), worker_id, "Worker started");
    let mut delay = ctx.initial_delay;

    loop {
        if shutdown.is_shutdown() {
            break;
        }

        match ctx.queue.pop() {
            Some(job) => {
                delay = ctx.initial_delay;
                execute(&ctx, worker_id, job).await;
            }
            None => {
                let stop = tokio::select! {
                    _ = sleep(delay) => false,
                    _ = shutdown.wait() => true,
                };
                if stop {
                    break;
                }
                delay = Duration::try_from_secs_f64(delay.as_secs_f64() * ctx.backoff)
                    .map_or(ctx.max_delay, |next| next.min(ctx.max_delay));
            }
        }
    }

    debug!(queue = %ctx.queue.name(), worker_id, "Worker stopped");
}

async fn execute(ctx: &WorkerContext, worker_id: usize, job: PendingJob) {
    let result = match ctx.worker_type {
        WorkerType::Greenlet => ctx.queue.execute(&job),
        WorkerType::Thread | WorkerType::Process => {
            let queue = Arc::clone(&ctx.queue);
            let blocking_job = job.clone();
            match tokio::task::spawn_blocking(move || queue.execute(&blocking_job)).await {
                Ok(result) => result,
                Err(e) => {
                    error!(task_id = %job.id, error = %e, "Worker thread failed");
                    return;
                }
            }
        }
    };

    match result {
        Ok(_) => info!(worker_id, task = %job.task, task_id = %job.id, "Task completed"),
        Err(e) => error!(worker_id, task = %job.task, task_id = %job.id, error = %e, "Task failed"),
    }
}

#[async_trait]
impl Consumer for MemoryConsumer {
    fn queue(&self) -> Arc<dyn QueueClient> {
        Arc::clone(&self.queue) as Arc<dyn QueueClient>
    }

    fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(
            queue = %self.queue.name(),
            workers = self.config.workers,
            worker_type = %self.config.worker_type,
            periodic = self.config.periodic,
            "Consumer started"
        );

        let mut workers: Vec<JoinHandle<()>> = (0..self.config.workers.max(1))
            .map(|worker_id| self.spawn_worker(worker_id, shutdown.clone()))
            .collect();
        let scheduler = self
            .config
            .periodic
            .then(|| self.spawn_scheduler(shutdown.clone()));

        let health_interval = Duration::from_secs(self.config.health_check_interval.max(1));
        loop {
            if !self.config.check_worker_health {
                shutdown.wait().await;
                break;
            }

            let stop = tokio::select! {
                _ = sleep(health_interval) => false,
                _ = shutdown.wait() => true,
            };
            if stop {
                break;
            }

            for (worker_id, handle) in workers.iter_mut().enumerate() {
                if handle.is_finished() {
                    warn!(queue = %self.queue.name(), worker_id, "Worker died, restarting");
                    *handle = self.spawn_worker(worker_id, shutdown.clone());
                }
            }
        }

        info!(queue = %self.queue.name(), "Consumer shutting down");
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Worker did not stop cleanly");
            }
        }
        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler did not stop cleanly");
            }
        }
        info!(queue = %self.queue.name(), "Consumer stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskwire_core::domain::{PeriodicOptions, QueueConfig, TaskError, TaskOptions};
    use taskwire_core::port::{shutdown_channel, ManualClock, SequentialIdProvider};

    fn queue() -> Arc<MemoryQueue> {
        Arc::new(MemoryQueue::new(
            QueueConfig::new("q"),
            Arc::new(SequentialIdProvider::new("task")),
        ))
    }

    fn counting_task(counter: &Arc<AtomicUsize>) -> taskwire_core::domain::TaskFn {
        let counter = Arc::clone(counter);
        Arc::new(move |_: Value| -> std::result::Result<Value, TaskError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        })
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        let reached = tokio::time::timeout(Duration::from_secs(5), async {
            while counter.load(Ordering::SeqCst) < expected {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "only {} tasks ran", counter.load(Ordering::SeqCst));
    }

    async fn run_until_done(worker_type: WorkerType) {
        let queue = queue();
        let counter = Arc::new(AtomicUsize::new(0));
        queue
            .register_task("count", &TaskOptions::default(), counting_task(&counter))
            .unwrap();

        let config = ConsumerConfig {
            workers: 2,
            worker_type,
            initial_delay: 0.01,
            max_delay: 0.05,
            periodic: false,
            ..Default::default()
        };
        let consumer = Arc::new(MemoryConsumer::new(
            Arc::clone(&queue),
            config,
            Arc::new(ManualClock::new(0)),
        ));

        let (tx, token) = shutdown_channel();
        let runner = tokio::spawn({
            let consumer = Arc::clone(&consumer);
            async move { consumer.run(token).await }
        });

        for _ in 0..5 {
            queue.enqueue("count", Value::Null).unwrap();
        }
        wait_for(&counter, 5).await;
        assert_eq!(queue.pending(), 0);

        tx.shutdown();
        let finished = tokio::time::timeout(Duration::from_secs(5), runner).await;
        tokio_test::assert_ok!(finished.unwrap().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_thread_workers_drain_queue() {
        run_until_done(WorkerType::Thread).await;
    }

    #[tokio::test]
    async fn test_greenlet_workers_drain_queue() {
        run_until_done(WorkerType::Greenlet).await;
    }

    #[tokio::test]
    async fn test_failing_task_keeps_worker_alive() {
        let queue = queue();
        let counter = Arc::new(AtomicUsize::new(0));
        queue
            .register_task(
                "boom",
                &TaskOptions::default(),
                Arc::new(|_: Value| -> std::result::Result<Value, TaskError> { panic!("boom") }),
            )
            .unwrap();
        queue
            .register_task("count", &TaskOptions::default(), counting_task(&counter))
            .unwrap();

        let config = ConsumerConfig {
            worker_type: WorkerType::Greenlet,
            initial_delay: 0.01,
            max_delay: 0.05,
            periodic: false,
            ..Default::default()
        };
        let consumer = Arc::new(MemoryConsumer::new(
            Arc::clone(&queue),
            config,
            Arc::new(ManualClock::new(0)),
        ));
        let (tx, token) = shutdown_channel();
        let runner = tokio::spawn({
            let consumer = Arc::clone(&consumer);
            async move { consumer.run(token).await }
        });

        queue.enqueue("boom", Value::Null).unwrap();
        queue.enqueue("count", Value::Null).unwrap();
        wait_for(&counter, 1).await;

        tx.shutdown();
        tokio_test::assert_ok!(runner.await.unwrap());
    }

    #[test]
    fn test_scheduler_tick_uses_clock() {
        let queue = queue();
        let counter = Arc::new(AtomicUsize::new(0));
        queue
            .register_periodic_task(
                "tick",
                &PeriodicOptions::every(Duration::from_secs(60)),
                counting_task(&counter),
            )
            .unwrap();

        let clock = Arc::new(ManualClock::new(1_000_000));
        let consumer = MemoryConsumer::new(
            Arc::clone(&queue),
            ConsumerConfig::default(),
            Arc::clone(&clock) as Arc<dyn TimeProvider>,
        );

        assert_eq!(consumer.tick_scheduler(), 0);
        clock.advance_secs(59);
        assert_eq!(consumer.tick_scheduler(), 0);
        clock.advance_secs(1);
        assert_eq!(consumer.tick_scheduler(), 1);
        assert_eq!(queue.pending(), 1);
    }

    #[tokio::test]
    async fn test_run_returns_when_already_shut_down() {
        let consumer = MemoryConsumer::new(
            queue(),
            ConsumerConfig::default(),
            Arc::new(ManualClock::new(0)),
        );
        let (tx, token) = shutdown_channel();
        tx.shutdown();
        tokio_test::assert_ok!(consumer.run(token).await);
    }
}
