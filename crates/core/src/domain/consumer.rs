// Consumer Domain Model - option merging, overrides & validated consumer config

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::Level;

/// Override key renamed to `verbose` (the command line reserves `-v`)
pub const HUEY_VERBOSE_KEY: &str = "huey_verbose";
pub const VERBOSE_KEY: &str = "verbose";

/// Programmatic consumer overrides (usually parsed command-line flags)
///
/// Null entries mean "not given" and never shadow declared settings.
/// Always built per call; there is no shared default instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerOverrides(Map<String, Value>);

impl ConsumerOverrides {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set an override; `None` / `Value::Null` records an absent flag
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Entries that actually override something
    pub fn non_null(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(_, value)| !value.is_null())
    }

    pub fn is_empty(&self) -> bool {
        self.non_null().next().is_none()
    }
}

impl From<Map<String, Value>> for ConsumerOverrides {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Merged, untyped consumer options handed to the queue library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerOptions(Map<String, Value>);

impl ConsumerOptions {
    /// Merge declared options with overrides
    ///
    /// Non-null overrides win. `huey_verbose` is then popped and becomes
    /// `verbose` unless `verbose` is already set.
    pub fn merge(declared: &Map<String, Value>, overrides: &ConsumerOverrides) -> Self {
        let mut options = declared.clone();

        for (key, value) in overrides.non_null() {
            options.insert(key.clone(), value.clone());
        }

        let huey_verbose = options.remove(HUEY_VERBOSE_KEY).unwrap_or(Value::Null);
        if !options.contains_key(VERBOSE_KEY) {
            options.insert(VERBOSE_KEY.to_string(), huey_verbose);
        }

        Self(options)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Parse into the typed consumer config (unknown keys are rejected)
    pub fn parse(&self) -> Result<ConsumerConfig> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| DomainError::InvalidConsumerOption(e.to_string()))
    }
}

/// Worker execution model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerType {
    #[default]
    Thread,
    Greenlet,
    Process,
}

impl std::fmt::Display for WorkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerType::Thread => write!(f, "thread"),
            WorkerType::Greenlet => write!(f, "greenlet"),
            WorkerType::Process => write!(f, "process"),
        }
    }
}

impl std::str::FromStr for WorkerType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "thread" => Ok(WorkerType::Thread),
            "greenlet" => Ok(WorkerType::Greenlet),
            "process" => Ok(WorkerType::Process),
            other => Err(DomainError::InvalidConsumerOption(format!(
                "unknown worker_type '{}' (expected thread, greenlet or process)",
                other
            ))),
        }
    }
}

/// Typed consumer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    pub workers: usize,
    pub worker_type: WorkerType,
    /// Seconds a worker sleeps after its first empty poll
    pub initial_delay: f64,
    /// Multiplier applied to the idle delay after each empty poll
    pub backoff: f64,
    /// Upper bound for the idle delay (seconds)
    pub max_delay: f64,
    pub check_worker_health: bool,
    pub health_check_interval: u64,
    /// Seconds between periodic-task checks; must divide 60
    pub scheduler_interval: u64,
    pub periodic: bool,
    pub logfile: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub simple_log: Option<bool>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            worker_type: WorkerType::Thread,
            initial_delay: 0.1,
            backoff: 1.15,
            max_delay: 10.0,
            check_worker_health: true,
            health_check_interval: 10,
            scheduler_interval: 1,
            periodic: true,
            logfile: None,
            verbose: None,
            simple_log: None,
        }
    }
}

impl ConsumerConfig {
    pub fn from_options(options: &ConsumerOptions) -> Result<Self> {
        options.parse()
    }

    /// Check option ranges
    ///
    /// # Errors
    /// - `InvalidConsumerOption` naming the first offending option
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(invalid("workers must be at least 1"));
        }
        if self.initial_delay <= 0.0 {
            return Err(invalid("initial_delay must be greater than 0"));
        }
        if self.backoff < 1.0 {
            return Err(invalid("backoff must be greater than or equal to 1"));
        }
        if self.max_delay < self.initial_delay {
            return Err(invalid("max_delay must not be smaller than initial_delay"));
        }
        if !(1..=60).contains(&self.scheduler_interval) {
            return Err(invalid("scheduler_interval must be a value between 1 and 60"));
        }
        if 60 % self.scheduler_interval != 0 {
            return Err(invalid("scheduler_interval must evenly divide 60"));
        }
        if self.check_worker_health && self.health_check_interval == 0 {
            return Err(invalid("health_check_interval must be at least 1"));
        }
        Ok(())
    }

    /// Logger settings derived from `verbose`, `logfile` and `simple_log`
    pub fn logging(&self) -> LoggingConfig {
        let level = match self.verbose {
            None => Level::INFO,
            Some(true) => Level::DEBUG,
            Some(false) => Level::WARN,
        };
        LoggingConfig {
            level,
            logfile: self.logfile.clone(),
            simple: self.simple_log.unwrap_or(false),
        }
    }
}

fn invalid(msg: &str) -> DomainError {
    DomainError::InvalidConsumerOption(msg.to_string())
}

/// Consumer logger settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: Level,
    pub logfile: Option<PathBuf>,
    pub simple: bool,
}
