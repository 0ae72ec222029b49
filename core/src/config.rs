//! Declarative options (feature = `"config"`)
//!
//! The same shapes as [`Options`], written in YAML or JSON:
//!
//! ```yaml
//! # a call name, or a call type if the vocabulary knows it
//! TestCall
//! ---
//! # a regex on the raw call name
//! { regex: "stc", ignore_case: true }
//! ---
//! # an object; each field takes one entry or a list
//! name: [Other, { regex: fake, ignore_case: true }]
//! type: [duplex, request_stream]
//! ```
//!
//! Custom tests are code-only. Any other value (number, bool, null, a
//! top-level list) is kept as [`OptionsConfig::Unrecognized`] and follows the
//! normalizer's [`Strictness`].

use crate::{
    CallTypeVocabulary, MatchSpec, NamePattern, Normalizer, OneOrMany, Options, RawSpec,
    Strictness, UnlessError,
};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// A regex entry: `{ regex: "...", ignore_case: bool }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternConfig {
    /// The pattern (Rust `regex` crate syntax).
    pub regex: String,
    /// Case-insensitive matching (default: false).
    #[serde(default)]
    pub ignore_case: bool,
}

impl PatternConfig {
    fn compile(&self) -> Result<Regex, UnlessError> {
        RegexBuilder::new(&self.regex)
            .case_insensitive(self.ignore_case)
            .build()
            .map_err(|source| UnlessError::InvalidPattern {
                pattern: self.regex.clone(),
                source,
            })
    }
}

/// The object shape, with entries kept as written until compilation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSpecConfig {
    /// Entries of the `name` key.
    pub name: Vec<Value>,
    /// Entries of the `type` key.
    pub call_type: Vec<Value>,
}

/// Options as loaded from a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum OptionsConfig {
    /// A bare string.
    Str(String),
    /// A bare regex.
    Pattern(PatternConfig),
    /// An object with `name` and/or `type`.
    Raw(RawSpecConfig),
    /// Anything else, kept verbatim.
    Unrecognized(Value),
}

impl From<Value> for OptionsConfig {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Str(s),
            Value::Object(map) if is_pattern(&map) => {
                match serde_json::from_value::<PatternConfig>(Value::Object(map.clone())) {
                    Ok(pattern) => Self::Pattern(pattern),
                    Err(_) => Self::Unrecognized(Value::Object(map)),
                }
            }
            Value::Object(mut map) => Self::Raw(RawSpecConfig {
                name: entries(map.remove("name")),
                call_type: entries(map.remove("type")),
            }),
            other => Self::Unrecognized(other),
        }
    }
}

/// A `regex` key alone (no `name` or `type`) marks the bare regex shape.
fn is_pattern(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("regex") && !map.contains_key("name") && !map.contains_key("type")
}

/// Flatten a one-or-many field; absent, `null` and a lone `""` mean no entries.
fn entries(field: Option<Value>) -> Vec<Value> {
    match field {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) => format!("list of {} entries", items.len()),
        Value::Object(_) => format!("object {value}"),
    }
}

impl OptionsConfig {
    /// Parse from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`UnlessError::InvalidConfig`] if the text is not valid YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, UnlessError> {
        serde_yaml::from_str(yaml).map_err(|e| UnlessError::InvalidConfig(e.to_string()))
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`UnlessError::InvalidConfig`] if the text is not valid JSON.
    pub fn from_json(json: &str) -> Result<Self, UnlessError> {
        serde_json::from_str(json).map_err(|e| UnlessError::InvalidConfig(e.to_string()))
    }

    /// Read a file; `.json` is parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`UnlessError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UnlessError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            UnlessError::InvalidConfig(format!("failed to read \"{}\": {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Compile into code-level [`Options`].
    ///
    /// Name entries that are neither strings nor regex objects, and type
    /// entries that are not strings, never match: they are dropped when
    /// permissive and rejected when strict.
    ///
    /// # Errors
    ///
    /// - [`UnlessError::InvalidPattern`] if a regex does not compile (either mode)
    /// - [`UnlessError::InvalidConfig`] for an unusable entry (strict only)
    pub fn into_options<Ctx>(self, strictness: Strictness) -> Result<Options<Ctx>, UnlessError> {
        match self {
            Self::Str(s) => Ok(Options::Str(s)),
            Self::Pattern(p) => Ok(Options::Pattern(p.compile()?)),
            Self::Raw(raw) => {
                let mut names = Vec::with_capacity(raw.name.len());
                for entry in raw.name {
                    match name_entry(&entry)? {
                        Some(pattern) => names.push(pattern),
                        None => reject_entry("name", &entry, strictness)?,
                    }
                }

                let mut types = Vec::with_capacity(raw.call_type.len());
                for entry in raw.call_type {
                    match entry {
                        Value::String(t) => types.push(t),
                        other => reject_entry("type", &other, strictness)?,
                    }
                }

                Ok(Options::Raw(
                    RawSpec::new()
                        .name(OneOrMany::Many(names))
                        .call_type(OneOrMany::Many(types)),
                ))
            }
            Self::Unrecognized(value) => Ok(Options::Unrecognized(describe(&value))),
        }
    }
}

fn name_entry(entry: &Value) -> Result<Option<NamePattern>, UnlessError> {
    match entry {
        Value::String(s) => Ok(Some(NamePattern::literal(s.as_str()))),
        Value::Object(_) => match serde_json::from_value::<PatternConfig>(entry.clone()) {
            Ok(p) => p.compile().map(|re| Some(NamePattern::Regex(re))),
            Err(_) => Ok(None),
        },
        _ => Ok(None),
    }
}

fn reject_entry(field: &str, entry: &Value, strictness: Strictness) -> Result<(), UnlessError> {
    match strictness {
        Strictness::Permissive => {
            debug!(field, entry = %entry, "dropping unusable entry");
            Ok(())
        }
        Strictness::Strict => Err(UnlessError::InvalidConfig(format!(
            "`{field}` entry {} is not usable",
            describe(entry)
        ))),
    }
}

impl<V: CallTypeVocabulary> Normalizer<V> {
    /// Compile and normalize declarative options.
    ///
    /// # Errors
    ///
    /// See [`OptionsConfig::into_options`] and [`Normalizer::normalize`].
    pub fn load<Ctx>(&self, config: OptionsConfig) -> Result<MatchSpec<Ctx>, UnlessError> {
        self.normalize(config.into_options(self.strictness())?)
    }

    /// Parse YAML, then [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// See [`OptionsConfig::from_yaml`] and [`load`](Self::load).
    pub fn load_yaml<Ctx>(&self, yaml: &str) -> Result<MatchSpec<Ctx>, UnlessError> {
        self.load(OptionsConfig::from_yaml(yaml)?)
    }
}
