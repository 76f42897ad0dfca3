//! Key and value rewrite rules.
//!
//! Each enabled option becomes a named step, and steps always run in the order
//! of [`KeyStep::ORDER`] and [`ValueStep::ORDER`] regardless of which subset is
//! switched on. The rules are total: any key or value in, a key or value out.

use std::sync::OnceLock;

use convert_case::{Case, Casing};
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::config::SanitizeConfig;

fn separator_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{M}\p{N}]+").expect("separator pattern is valid"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// A single key-renaming step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStep {
    SnakeCase,
    KebabCase,
}

impl KeyStep {
    /// Snake case runs before kebab case; kebab case sees the snake output.
    pub const ORDER: [KeyStep; 2] = [KeyStep::SnakeCase, KeyStep::KebabCase];

    pub fn name(&self) -> &'static str {
        match self {
            KeyStep::SnakeCase => "snake_case",
            KeyStep::KebabCase => "kebab_case",
        }
    }

    pub fn is_enabled(&self, config: &SanitizeConfig) -> bool {
        match self {
            KeyStep::SnakeCase => config.keys_snake_case,
            KeyStep::KebabCase => config.keys_kebab_case,
        }
    }

    pub fn apply(&self, key: &str) -> String {
        let case = match self {
            KeyStep::SnakeCase => Case::Snake,
            KeyStep::KebabCase => Case::Kebab,
        };
        split_separators(key).to_case(case)
    }
}

/// Replace every run of characters that are not letters, combining marks or
/// digits with a single space so the case converter treats it as one word
/// boundary.
fn split_separators(key: &str) -> String {
    separator_run().replace_all(key, " ").trim().to_string()
}

/// A single string-normalizing step. Non-string values pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueStep {
    TrimStrings,
    RemoveEmptyStrings,
    SimplifyWhitespace,
}

impl ValueStep {
    pub const ORDER: [ValueStep; 3] = [
        ValueStep::TrimStrings,
        ValueStep::RemoveEmptyStrings,
        ValueStep::SimplifyWhitespace,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValueStep::TrimStrings => "trim_strings",
            ValueStep::RemoveEmptyStrings => "remove_empty_strings",
            ValueStep::SimplifyWhitespace => "simplify_whitespace",
        }
    }

    pub fn is_enabled(&self, config: &SanitizeConfig) -> bool {
        match self {
            ValueStep::TrimStrings => config.values_trim_strings,
            ValueStep::RemoveEmptyStrings => config.values_remove_empty_strings,
            ValueStep::SimplifyWhitespace => config.values_simplify_whitespace,
        }
    }

    pub fn apply(&self, value: JsonValue) -> JsonValue {
        let s = match value {
            JsonValue::String(s) => s,
            other => return other,
        };

        match self {
            ValueStep::TrimStrings => JsonValue::String(s.trim().to_string()),
            ValueStep::RemoveEmptyStrings if s.is_empty() => JsonValue::Null,
            ValueStep::RemoveEmptyStrings => JsonValue::String(s),
            // Any whitespace run, newlines and tabs included, becomes one space.
            ValueStep::SimplifyWhitespace => {
                JsonValue::String(whitespace_run().replace_all(&s, " ").into_owned())
            }
        }
    }
}

/// The enabled key and value steps for one configuration, in run order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePipeline {
    key_steps: Vec<KeyStep>,
    value_steps: Vec<ValueStep>,
}

impl RulePipeline {
    pub fn from_config(config: &SanitizeConfig) -> Self {
        Self {
            key_steps: KeyStep::ORDER
                .into_iter()
                .filter(|step| step.is_enabled(config))
                .collect(),
            value_steps: ValueStep::ORDER
                .into_iter()
                .filter(|step| step.is_enabled(config))
                .collect(),
        }
    }

    pub fn key_steps(&self) -> &[KeyStep] {
        &self.key_steps
    }

    pub fn value_steps(&self) -> &[ValueStep] {
        &self.value_steps
    }

    /// Names of the enabled steps, keys first, in run order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.key_steps
            .iter()
            .map(KeyStep::name)
            .chain(self.value_steps.iter().map(ValueStep::name))
            .collect()
    }

    pub fn transform_key(&self, key: &str) -> String {
        self.key_steps
            .iter()
            .fold(key.to_string(), |current, step| step.apply(&current))
    }

    pub fn transform_value(&self, value: JsonValue) -> JsonValue {
        self.value_steps
            .iter()
            .fold(value, |current, step| step.apply(current))
    }
}

/// Rename `key` according to the key options of `config`.
pub fn transform_key(key: &str, config: &SanitizeConfig) -> String {
    RulePipeline::from_config(config).transform_key(key)
}

/// Normalize `value` according to the value options of `config`.
pub fn transform_value(value: JsonValue, config: &SanitizeConfig) -> JsonValue {
    RulePipeline::from_config(config).transform_value(value)
}
