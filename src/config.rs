//! Mapper configuration and loader.
//!
//! Configuration is read once at start-up from JSON or YAML files and/or
//! `MAP_SANITIZE_*` environment variables, then shared read-only by the mapper.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::ConfigError;

/// Prefix for settings supplied through the environment.
pub const ENV_PREFIX: &str = "MAP_SANITIZE_";

/// Option names, in the order they are documented.
pub const PROPERTIES: &str = "properties";
pub const KEYS_SNAKE_CASE: &str = "keys_snake_case";
pub const KEYS_KEBAB_CASE: &str = "keys_kebab_case";
pub const VALUES_TRIM_STRINGS: &str = "values_trim_strings";
pub const VALUES_REMOVE_EMPTY_STRINGS: &str = "values_remove_empty_strings";
pub const VALUES_SIMPLIFY_WHITESPACE: &str = "values_simplify_whitespace";

const BOOLEAN_SETTINGS: [(&str, &str); 5] = [
    (KEYS_SNAKE_CASE, "Snake case for keys"),
    (KEYS_KEBAB_CASE, "Kebab case for keys"),
    (
        VALUES_TRIM_STRINGS,
        "Trim whitespace at start and end of strings",
    ),
    (VALUES_REMOVE_EMPTY_STRINGS, "Prefer null to empty string ''"),
    (
        VALUES_SIMPLIFY_WHITESPACE,
        "Change newlines and multiple consecutive spaces to a single space",
    ),
];

/// Sanitize settings. Every flag defaults to off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Reserved; accepted but not used by any rule.
    pub properties: Option<Vec<JsonValue>>,

    pub keys_snake_case: bool,
    pub keys_kebab_case: bool,

    pub values_trim_strings: bool,
    pub values_remove_empty_strings: bool,
    pub values_simplify_whitespace: bool,
}

/// Where a piece of configuration comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Env,
}

impl ConfigSource {
    /// `ENV` selects the environment; anything else is a file path.
    pub fn parse(arg: &str) -> Self {
        if arg == "ENV" {
            ConfigSource::Env
        } else {
            ConfigSource::File(PathBuf::from(arg))
        }
    }
}

impl SanitizeConfig {
    /// Load configuration from a single JSON or YAML file.
    ///
    /// # Example
    /// ```ignore
    /// use map_sanitize::SanitizeConfig;
    ///
    /// let config = SanitizeConfig::load_from_file("config.json")?;
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = read_settings_file(path.as_ref())?;
        Self::from_settings(settings)
    }

    /// Load and merge configuration from several sources.
    ///
    /// Sources are applied in order; a key set by a later source replaces the
    /// same key from an earlier one.
    pub fn load(sources: &[ConfigSource]) -> Result<Self, ConfigError> {
        let mut merged = Map::new();

        for source in sources {
            let settings = match source {
                ConfigSource::File(path) => read_settings_file(path)?,
                ConfigSource::Env => settings_from_lookup(|name| std::env::var(name).ok())?,
            };
            merged.extend(settings);
        }

        Self::from_settings(merged)
    }

    /// Build configuration from environment-style variables, using `lookup`
    /// to resolve names such as `MAP_SANITIZE_KEYS_SNAKE_CASE`.
    pub fn from_env_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_settings(settings_from_lookup(lookup)?)
    }

    fn from_settings(settings: Map<String, JsonValue>) -> Result<Self, ConfigError> {
        serde_json::from_value(JsonValue::Object(settings))
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// True when no rule would alter a message.
    pub fn is_noop(&self) -> bool {
        !(self.keys_snake_case
            || self.keys_kebab_case
            || self.values_trim_strings
            || self.values_remove_empty_strings
            || self.values_simplify_whitespace)
    }

    /// JSON Schema describing the accepted settings.
    pub fn json_schema() -> JsonValue {
        let mut properties = Map::new();
        properties.insert(
            PROPERTIES.to_string(),
            json!({
                "type": ["array", "null"],
                "default": null,
                "description": "Reserved for future per-property rules",
            }),
        );
        for (name, description) in BOOLEAN_SETTINGS {
            properties.insert(
                name.to_string(),
                json!({
                    "type": "boolean",
                    "default": false,
                    "description": description,
                }),
            );
        }

        json!({
            "type": "object",
            "properties": properties,
        })
    }
}

fn read_settings_file(path: &Path) -> Result<Map<String, JsonValue>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    // JSON is valid YAML, so one parser covers both formats.
    let value: JsonValue = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(Map::new()),
        other => Err(ConfigError::Parse {
            path: path.display().to_string(),
            reason: format!("expected a mapping at top level, found {}", other),
        }),
    }
}

fn settings_from_lookup<F>(lookup: F) -> Result<Map<String, JsonValue>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Map::new();

    for (name, _) in BOOLEAN_SETTINGS {
        let var = env_var_name(name);
        if let Some(raw) = lookup(&var) {
            let flag = parse_flag(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("{} must be a boolean, got '{}'", var, raw))
            })?;
            settings.insert(name.to_string(), JsonValue::Bool(flag));
        }
    }

    let var = env_var_name(PROPERTIES);
    if let Some(raw) = lookup(&var) {
        let value: JsonValue = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Invalid(format!("{} is not valid JSON: {}", var, e)))?;
        settings.insert(PROPERTIES.to_string(), value);
    }

    Ok(settings)
}

fn env_var_name(setting: &str) -> String {
    format!("{}{}", ENV_PREFIX, setting.to_uppercase())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
