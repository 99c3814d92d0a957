//! String-keyed context shared between job stages

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Mutable key/value bag; every value is stored as a string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableContext {
    values: BTreeMap<String, String>,
}

impl MutableContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_string(key).unwrap_or(default)
    }

    /// Missing and unparseable values both read as `None`
    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.get_string(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get_string(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_string(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set_long(&mut self, key: impl Into<String>, value: i64) {
        self.set_string(key, value.to_string());
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.set_string(key, value.to_string());
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set_string(key, value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn set_all<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in entries {
            self.set_string(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
