// Settings Domain Model - shape classification & ambient host settings

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Queue name used when neither the settings nor the host database name one
pub const FALLBACK_QUEUE_NAME: &str = "huey";

/// Classified settings block
///
/// Computed once at load time by [`SettingsShape::classify`] instead of
/// re-inspecting the mapping every time a decision depends on its shape.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsShape {
    /// No settings block supplied
    Unset,
    /// Single queue: `name`, `connection`, `consumer`, ... at the top level
    Legacy(Map<String, Value>),
    /// Named queues: every value is itself a single-queue mapping
    Modern(Map<String, Value>),
}

impl SettingsShape {
    /// Classify a raw settings value
    ///
    /// A mapping is modern iff every value is itself a mapping, so an empty
    /// mapping is modern (with no queues). Anything that is not a mapping is
    /// rejected.
    pub fn classify(settings: Option<&Value>) -> Result<Self> {
        match settings {
            None | Some(Value::Null) => Ok(SettingsShape::Unset),
            Some(Value::Object(map)) => {
                if is_legacy_shaped(map) {
                    Ok(SettingsShape::Legacy(map.clone()))
                } else {
                    Ok(SettingsShape::Modern(map.clone()))
                }
            }
            Some(other) => Err(DomainError::InvalidSettings(format!(
                "settings must be a mapping, got {}",
                type_name(other)
            ))),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, SettingsShape::Legacy(_))
    }

    pub fn is_modern(&self) -> bool {
        matches!(self, SettingsShape::Modern(_))
    }
}

/// True iff at least one top-level value is not a mapping
pub fn is_legacy_shaped(map: &Map<String, Value>) -> bool {
    map.values().any(|value| !value.is_object())
}

/// True iff every top-level value is a mapping
pub fn is_modern_shaped(map: &Map<String, Value>) -> bool {
    !is_legacy_shaped(map)
}

/// Truthiness of a settings value (`false`, `null`, `0`, `""`, `[]`, `{}` are falsy)
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Host application settings the resolvers depend on
///
/// Passed explicitly into every resolver; nothing in core reads global state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmbientSettings {
    /// Host debug flag, the default for `always_eager`
    #[serde(default)]
    pub debug: bool,

    /// Explicit database name (first choice for the default queue name)
    #[serde(default)]
    pub database_name: Option<String>,

    /// Database configurations; `default.NAME` is the second choice
    #[serde(default)]
    pub databases: Option<Map<String, Value>>,
}

impl AmbientSettings {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Default::default()
        }
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    pub fn with_databases(mut self, databases: Map<String, Value>) -> Self {
        self.databases = Some(databases);
        self
    }

    /// Database-derived queue name
    ///
    /// `database_name`, else `databases.default.NAME`, else `"huey"`.
    pub fn default_queue_name(&self) -> String {
        if let Some(name) = &self.database_name {
            return name.clone();
        }

        self.databases
            .as_ref()
            .and_then(|dbs| dbs.get("default"))
            .and_then(|default| default.get("NAME").or_else(|| default.get("name")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_QUEUE_NAME.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_classify_unset() {
        assert_eq!(SettingsShape::classify(None).unwrap(), SettingsShape::Unset);
        assert_eq!(
            SettingsShape::classify(Some(&Value::Null)).unwrap(),
            SettingsShape::Unset
        );
    }

    #[test]
    fn test_classify_legacy() {
        let settings = json!({
            "name": "myapp",
            "connection": {"host": "localhost", "port": 6378},
            "consumer": {"workers": 4},
        });
        assert!(SettingsShape::classify(Some(&settings)).unwrap().is_legacy());

        // A lone flag is still a single queue
        let eager_only = json!({"always_eager": true});
        assert!(SettingsShape::classify(Some(&eager_only)).unwrap().is_legacy());
    }

    #[test]
    fn test_classify_modern() {
        let settings = json!({
            "my-app": {"default": true, "connection": {}},
            "my-app2": {"connection": {}},
        });
        assert!(SettingsShape::classify(Some(&settings)).unwrap().is_modern());
    }

    #[test]
    fn test_classify_empty_mapping_is_modern() {
        let shape = SettingsShape::classify(Some(&json!({}))).unwrap();
        assert_eq!(shape, SettingsShape::Modern(Map::new()));
    }

    #[test]
    fn test_classify_rejects_non_mapping() {
        let err = SettingsShape::classify(Some(&json!("redis://localhost"))).unwrap_err();
        assert!(err.to_string().contains("must be a mapping"));
    }

    #[test]
    fn test_legacy_and_modern_are_exclusive() {
        let modern = as_map(json!({"a": {}, "b": {"x": 1}}));
        assert!(is_modern_shaped(&modern));
        assert!(!is_legacy_shaped(&modern));

        let legacy = as_map(json!({"a": {}, "name": "b"}));
        assert!(is_legacy_shaped(&legacy));
        assert!(!is_modern_shaped(&legacy));
    }

    #[test]
    fn test_truthiness() {
        for falsy in [json!(false), json!(null), json!(0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!("yes"), json!([0]), json!({"a": 1})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_default_queue_name_fallback_chain() {
        let explicit = AmbientSettings::new(false)
            .with_database_name("explicit")
            .with_databases(as_map(json!({"default": {"NAME": "from-databases"}})));
        assert_eq!(explicit.default_queue_name(), "explicit");

        let databases = AmbientSettings::new(false)
            .with_databases(as_map(json!({"default": {"NAME": "from-databases"}})));
        assert_eq!(databases.default_queue_name(), "from-databases");

        let no_name = AmbientSettings::new(false)
            .with_databases(as_map(json!({"default": {"ENGINE": "sqlite3"}})));
        assert_eq!(no_name.default_queue_name(), "huey");

        assert_eq!(AmbientSettings::default().default_queue_name(), "huey");
    }
}
