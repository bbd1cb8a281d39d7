//! Translation catalogs.
//!
//! A catalog is the set of messages for one locale. Catalogs are authored as
//! nested JSON objects and flattened into dotted keys, so
//! `{"nav": {"home": "Home"}}` exposes the message `nav.home`. Message values
//! are Fluent patterns and may contain placeables such as `{ $name }`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Separator used when flattening nested catalog objects.
pub const KEY_SEPARATOR: char = '.';

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    messages: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from already flattened `(key, pattern)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            messages: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Flattens a JSON value into a catalog.
    ///
    /// Strings are kept as-is, numbers and booleans are stringified, arrays and
    /// nulls are skipped. A non-object root yields an empty catalog.
    pub fn from_value(value: &Value) -> Self {
        let mut catalog = Self::default();
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    catalog.flatten_into(key.clone(), child);
                }
            },
            other => {
                tracing::warn!("Ignoring catalog whose root is not an object: {}", other);
            },
        }
        catalog
    }

    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(source)?;
        Ok(Self::from_value(&value))
    }

    fn flatten_into(&mut self, prefix: String, value: &Value) {
        match value {
            Value::String(text) => {
                self.messages.insert(prefix, text.clone());
            },
            Value::Number(number) => {
                self.messages.insert(prefix, number.to_string());
            },
            Value::Bool(flag) => {
                self.messages.insert(prefix, flag.to_string());
            },
            Value::Object(map) => {
                for (key, child) in map {
                    self.flatten_into(format!("{}{}{}", prefix, KEY_SEPARATOR, key), child);
                }
            },
            Value::Array(_) | Value::Null => {
                tracing::debug!("Skipping non-message catalog entry '{}'", prefix);
            },
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, pattern: impl Into<String>) {
        self.messages.insert(key.into(), pattern.into());
    }

    /// Merges `other` into `self`; keys from `other` win.
    pub fn merge(&mut self, other: &Catalog) {
        for (key, value) in &other.messages {
            self.messages.insert(key.clone(), value.clone());
        }
    }

    /// `(key, pattern)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.messages
            .iter()
            .map(|(key, pattern)| (key.as_str(), pattern.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}
