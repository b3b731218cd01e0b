// Application settings - settings file layered under TASKWIRE_* environment

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use taskwire_core::domain::AmbientSettings;
use tracing::debug;

pub const DEFAULT_SETTINGS_FILE: &str = "taskwire.toml";
pub const ENV_PREFIX: &str = "TASKWIRE";

/// Host settings read by the consumer command
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub debug: bool,
    pub database_name: Option<String>,
    pub databases: Option<Map<String, Value>>,

    /// Queue settings, single-queue or named-queue form
    pub queues: Option<Value>,
}

/// The `queues` table read straight from the file, queue names untouched
#[derive(Debug, Default, Deserialize)]
struct QueuesSection {
    #[serde(default)]
    queues: Option<Value>,
}

impl AppSettings {
    /// Load `path` (optional) with `TASKWIRE_*` variables on top
    ///
    /// Nested keys use `__`: `TASKWIRE_QUEUES__my-app__always_eager=true`.
    /// Environment keys arrive lowercased, so queues defined in the file win
    /// over queues defined in the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading settings");

        let mut settings: Self = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if let Some(queues) = read_queues(path)? {
            settings.queues = Some(queues);
        }
        Ok(settings)
    }

    pub fn ambient(&self) -> AmbientSettings {
        AmbientSettings {
            debug: self.debug,
            database_name: self.database_name.clone(),
            databases: self.databases.clone(),
        }
    }
}

// config folds keys to lowercase; queue names are case sensitive
fn read_queues(path: &Path) -> Result<Option<Value>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::Foreign(Box::new(e))),
    };

    let section: QueuesSection = match path.extension().and_then(OsStr::to_str) {
        Some("json") => serde_json::from_str(&contents).map_err(|e| ConfigError::Foreign(Box::new(e)))?,
        Some("toml") | None => toml::from_str(&contents).map_err(|e| ConfigError::Foreign(Box::new(e)))?,
        _ => return Ok(None),
    };
    Ok(section.queues)
}
