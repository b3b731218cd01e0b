// Taskwire Consumer - composition root for the `taskwire` executable

pub mod builtin;
pub mod cli;
pub mod settings;

use crate::cli::RunConsumerArgs;
use crate::settings::AppSettings;
use std::future::Future;
use std::sync::Arc;
use taskwire_core::port::{shutdown_channel, Consumer};
use taskwire_core::{BackendCatalog, QueueRegistry, TaskModule};
use taskwire_infra_memory::MemoryBackend;
use tracing::info;

/// Started registry plus the consumer picked for this run
pub struct Prepared {
    pub registry: QueueRegistry,
    pub consumer: Arc<dyn Consumer>,
}

/// Registry over the backends this executable ships with
pub fn build_registry(
    settings: &AppSettings,
    args: &RunConsumerArgs,
) -> taskwire_core::Result<QueueRegistry> {
    let catalog = BackendCatalog::single(Arc::new(MemoryBackend::new()));
    QueueRegistry::new(
        settings.queues.as_ref(),
        args.to_overrides(),
        settings.ambient(),
        catalog,
    )
}

/// Start the registry, let `modules` register their tasks, pick the consumer
///
/// `--queue` selects a named consumer; otherwise the default queue's.
pub fn prepare(
    settings: &AppSettings,
    args: &RunConsumerArgs,
    modules: &[Arc<dyn TaskModule>],
) -> taskwire_core::Result<Prepared> {
    let registry = build_registry(settings, args)?;
    registry.start()?;

    let discovered = registry.autodiscover(modules)?;
    info!(modules = discovered, "Task modules discovered");

    let consumer = match &args.queue {
        Some(name) => registry.consumer_for(name)?,
        None => registry.consumer()?,
    };
    Ok(Prepared { registry, consumer })
}

/// Run `consumer` until `stop` resolves, then shut its workers down
pub async fn run_until<F>(consumer: Arc<dyn Consumer>, stop: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let queue_name = consumer.queue().name().to_string();
    println!("Run huey on {}", queue_name);
    info!(queue = %queue_name, "Run huey on {}", queue_name);

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let runner = tokio::spawn(async move { consumer.run(shutdown_rx).await });

    stop.await;
    info!(queue = %queue_name, "Shutdown signal received");
    shutdown_tx.shutdown();

    runner.await??;
    Ok(())
}
