//! Configuration records - option name to value mappings for one tool invocation

use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Value of a single option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// `--flag value`
    Text(String),
    /// `--flag a,b,c`
    List(Vec<String>),
    /// `--flag` with no value when true
    Flag(bool),
    /// A value read from configuration that is none of the above (numbers, maps, nulls)
    Unsupported { kind: &'static str, raw: String },
}

impl OptionValue {
    /// Convert a YAML value, keeping anything unrecognized as `Unsupported`
    pub fn from_yaml(value: &Value) -> Self {
        match value {
            Value::String(s) => OptionValue::Text(s.clone()),
            Value::Bool(b) => OptionValue::Flag(*b),
            Value::Sequence(items) => {
                let texts: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect();
                match texts {
                    Some(texts) => OptionValue::List(texts),
                    None => OptionValue::Unsupported {
                        kind: "mixed list",
                        raw: render_raw(value),
                    },
                }
            }
            Value::Number(_) => OptionValue::Unsupported {
                kind: "number",
                raw: render_raw(value),
            },
            Value::Null => OptionValue::Unsupported {
                kind: "null",
                raw: String::new(),
            },
            Value::Mapping(_) => OptionValue::Unsupported {
                kind: "mapping",
                raw: render_raw(value),
            },
            Value::Tagged(_) => OptionValue::Unsupported {
                kind: "tagged value",
                raw: render_raw(value),
            },
        }
    }
}

fn render_raw(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Flag(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::List(value)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(value: Vec<&str>) -> Self {
        OptionValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&std::path::Path> for OptionValue {
    fn from(value: &std::path::Path) -> Self {
        OptionValue::Text(value.to_string_lossy().into_owned())
    }
}

impl From<&std::path::PathBuf> for OptionValue {
    fn from(value: &std::path::PathBuf) -> Self {
        OptionValue::from(value.as_path())
    }
}

/// Option name to value mapping used to build one command line
///
/// Keys iterate in sorted order. A `Flag(false)` is never stored: setting it
/// removes the key, so "false" and "absent" are the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigRecord {
    entries: BTreeMap<String, OptionValue>,
}

impl ConfigRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set an option; `Flag(false)` unsets it
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        let key = key.into();
        match value.into() {
            OptionValue::Flag(false) => {
                self.entries.remove(&key);
            }
            value => {
                self.entries.insert(key, value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry of `other` into this record, overriding existing keys
    pub fn merge(&mut self, other: &ConfigRecord) {
        for (key, value) in other.iter() {
            self.set(key, value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for ConfigRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = ConfigRecord::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

impl<'de> Deserialize<'de> for ConfigRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_yaml::Mapping::deserialize(deserializer)?;
        let mut record = ConfigRecord::new();
        for (key, value) in raw.iter() {
            let key = key
                .as_str()
                .ok_or_else(|| D::Error::custom(format!("option names must be strings, got {:?}", key)))?;
            record.set(key, OptionValue::from_yaml(value));
        }
        Ok(record)
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Text(s) => serializer.serialize_str(s),
            OptionValue::Flag(b) => serializer.serialize_bool(*b),
            OptionValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            OptionValue::Unsupported { raw, .. } => serializer.serialize_str(raw),
        }
    }
}

impl Serialize for ConfigRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
