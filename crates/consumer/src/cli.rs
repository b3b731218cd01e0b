// Command-line surface: `taskwire run-consumer`

use crate::settings::DEFAULT_SETTINGS_FILE;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taskwire_core::domain::consumer::{HUEY_VERBOSE_KEY, VERBOSE_KEY};
use taskwire_core::domain::{ConsumerOverrides, WorkerType};

#[derive(Parser, Debug)]
#[command(name = "taskwire")]
#[command(about = "Taskwire queue consumer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "TASKWIRE_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the consumer of a queue (the default queue unless --queue is given)
    RunConsumer(RunConsumerArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunConsumerArgs {
    /// Name of the queue to consume
    #[arg(short = 'Q', long = "queue", visible_alias = "qu")]
    pub queue: Option<String>,

    /// Redirect logs to this file
    #[arg(short = 'l', long, help_heading = "Logging")]
    pub logfile: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(short = 'V', long = "huey-verbose", help_heading = "Logging")]
    pub huey_verbose: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long, help_heading = "Logging", conflicts_with = "huey_verbose")]
    pub quiet: bool,

    /// Compact log lines without timestamps
    #[arg(short = 'S', long, help_heading = "Logging")]
    pub simple: bool,

    /// Number of worker loops
    #[arg(short = 'w', long, help_heading = "Workers")]
    pub workers: Option<usize>,

    /// thread, greenlet or process
    #[arg(short = 'k', long = "worker-type", help_heading = "Workers")]
    pub worker_type: Option<WorkerType>,

    /// Seconds to sleep after the first empty poll
    #[arg(short = 'd', long = "delay", help_heading = "Workers")]
    pub initial_delay: Option<f64>,

    /// Upper bound for the poll delay in seconds
    #[arg(short = 'm', long = "max-delay", help_heading = "Workers")]
    pub max_delay: Option<f64>,

    /// Poll delay multiplier
    #[arg(short = 'b', long, help_heading = "Workers")]
    pub backoff: Option<f64>,

    /// Seconds between worker health checks
    #[arg(short = 'c', long = "health-check-interval", help_heading = "Workers")]
    pub health_check_interval: Option<u64>,

    #[arg(short = 'C', long = "disable-health-check", help_heading = "Workers")]
    pub disable_health_check: bool,

    /// Seconds between periodic task checks (must divide 60)
    #[arg(short = 's', long = "scheduler-interval", help_heading = "Scheduler")]
    pub scheduler_interval: Option<u64>,

    /// Do not enqueue periodic tasks
    #[arg(short = 'n', long = "no-periodic", help_heading = "Scheduler")]
    pub no_periodic: bool,
}

impl RunConsumerArgs {
    /// Flags as consumer overrides; flags not given stay null
    pub fn to_overrides(&self) -> ConsumerOverrides {
        ConsumerOverrides::new()
            .set("workers", self.workers)
            .set("worker_type", self.worker_type.map(|t| t.to_string()))
            .set("initial_delay", self.initial_delay)
            .set("max_delay", self.max_delay)
            .set("backoff", self.backoff)
            .set("health_check_interval", self.health_check_interval)
            .set("check_worker_health", self.disable_health_check.then_some(false))
            .set("scheduler_interval", self.scheduler_interval)
            .set("periodic", self.no_periodic.then_some(false))
            .set(
                "logfile",
                self.logfile.as_ref().map(|p| p.display().to_string()),
            )
            .set(HUEY_VERBOSE_KEY, self.huey_verbose.then_some(true))
            .set(VERBOSE_KEY, self.quiet.then_some(false))
            .set("simple_log", self.simple.then_some(true))
    }
}
