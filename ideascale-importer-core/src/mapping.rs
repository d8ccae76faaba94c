//! Declarative field mapping.
//!
//! A mapping configuration is an ordered table `output field -> source key`
//! where the source may be a single key or a list of candidates tried in
//! order. The table drives two things: which custom fields are pulled off a
//! raw idea ([`MappingConfig::relevant_keys`] + [`extract_custom_fields`]) and
//! how each output field is resolved against them ([`resolve`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::sanitize::Sanitizer;

/// A JSON object as read from the source API or written to an artifact.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingKey {
    Single(String),
    Candidates(Vec<String>),
}

impl MappingKey {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            MappingKey::Single(k) => std::slice::from_ref(k),
            MappingKey::Candidates(ks) => ks,
        };
        slice.iter().map(String::as_str)
    }
}

impl From<&str> for MappingKey {
    fn from(key: &str) -> Self {
        MappingKey::Single(key.to_string())
    }
}

impl From<Vec<&str>> for MappingKey {
    fn from(keys: Vec<&str>) -> Self {
        MappingKey::Candidates(keys.into_iter().map(str::to_string).collect())
    }
}

/// Ordered `output field -> source key(s)` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingConfig {
    entries: Vec<(String, MappingKey)>,
}

impl MappingConfig {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<MappingKey>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &MappingKey)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Every source key referenced by any entry.
    pub fn relevant_keys(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .flat_map(|(_, key)| key.keys())
            .map(str::to_string)
            .collect()
    }

    /// Resolves every entry against `source`, in table order. Entries that
    /// do not resolve are left out.
    pub fn resolve_all(&self, source: &Record) -> Vec<(String, Value)> {
        self.entries
            .iter()
            .filter_map(|(field, key)| resolve(key, source).map(|v| (field.clone(), v.clone())))
            .collect()
    }
}

impl<'de> Deserialize<'de> for MappingConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Going through `Map` keeps the file's key order (preserve_order).
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (field, value) in raw {
            let key = MappingKey::deserialize(value).map_err(|e| {
                <D::Error as serde::de::Error>::custom(format!(
                    "mapping for `{field}` must be a key or a list of keys: {e}"
                ))
            })?;
            entries.push((field, key));
        }
        Ok(Self { entries })
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Looks `key` up in `source`.
///
/// A single key only has to be present; its value may be empty. A candidate
/// list yields the first candidate that is present and non-empty.
pub fn resolve<'a>(key: &MappingKey, source: &'a Record) -> Option<&'a Value> {
    match key {
        MappingKey::Single(k) => source.get(k),
        MappingKey::Candidates(ks) => ks
            .iter()
            .filter_map(|k| source.get(k))
            .find(|v| !is_empty_value(v)),
    }
}

/// Narrows an idea's custom field bag to `keys`, sanitising text values.
pub fn extract_custom_fields(
    idea: &Record,
    bag_key: &str,
    keys: &BTreeSet<String>,
    sanitizer: &Sanitizer,
) -> Record {
    let Some(Value::Object(bag)) = idea.get(bag_key) else {
        return Record::new();
    };
    keys.iter()
        .filter_map(|k| {
            let value = bag.get(k)?;
            let cleaned = match value {
                Value::String(text) => Value::String(sanitizer.sanitize(text)),
                other => other.clone(),
            };
            Some((k.clone(), cleaned))
        })
        .collect()
}
