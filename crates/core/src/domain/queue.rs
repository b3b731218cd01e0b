// Queue Domain Model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings key selecting a backend from the catalog
pub const BACKEND_KEY: &str = "backend";

/// Resolved queue configuration
///
/// Everything a queue backend needs to construct a queue client: the name
/// the client is built under, its broker connection parameters, any other
/// top-level keyword arguments, and the eager-execution flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    pub connection: Map<String, Value>,
    pub arguments: Map<String, Value>,
    pub always_eager: bool,
    pub is_default: bool,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection: Map::new(),
            arguments: Map::new(),
            always_eager: false,
            is_default: false,
        }
    }

    /// Flattened keyword arguments for the queue constructor
    ///
    /// Top-level arguments first, connection parameters override them,
    /// `always_eager` is always present.
    pub fn construction_arguments(&self) -> Map<String, Value> {
        let mut args = self.arguments.clone();
        for (key, value) in &self.connection {
            args.insert(key.clone(), value.clone());
        }
        args.insert("always_eager".to_string(), Value::Bool(self.always_eager));
        args
    }

    /// Backend id requested by the settings, if any
    pub fn backend(&self) -> Option<&str> {
        self.connection
            .get(BACKEND_KEY)
            .or_else(|| self.arguments.get(BACKEND_KEY))
            .and_then(Value::as_str)
    }

    /// Connection parameter lookup (`host`, `port`, `location`, ...)
    pub fn connection_param(&self, key: &str) -> Option<&Value> {
        self.connection.get(key)
    }
}
