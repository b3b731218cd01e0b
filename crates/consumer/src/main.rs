//! Taskwire - queue consumer entry point

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use taskwire_consumer::builtin::HealthTasks;
use taskwire_consumer::cli::{Cli, Commands};
use taskwire_consumer::settings::AppSettings;
use taskwire_consumer::{prepare, run_until};
use taskwire_core::application::config_error_report;
use taskwire_core::{AppError, TaskModule, VERSION};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = AppSettings::load(&cli.settings)
        .map_err(|e| anyhow::anyhow!("Loading settings from {} failed: {}", cli.settings.display(), e))?;

    match cli.command {
        Commands::RunConsumer(args) => {
            let modules: Vec<Arc<dyn TaskModule>> = vec![Arc::new(HealthTasks)];

            let prepared = match prepare(&settings, &args, &modules) {
                Ok(prepared) => prepared,
                Err(e) if e.is_fatal() => fail_with_guide(&e),
                Err(e) => return Err(e.into()),
            };
            info!("Taskwire v{} consumer ready", VERSION);

            run_until(prepared.consumer, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Cannot listen for Ctrl+C, stopping");
                }
            })
            .await?;

            info!("Shutdown complete.");
        }
    }

    Ok(())
}

fn fail_with_guide(error: &AppError) -> ! {
    eprintln!("{}", config_error_report(&format!("Error: {}", error)));
    std::process::exit(1);
}
