//! Shared key/value store that task outputs are merged into.

use crate::error::WorkflowError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between segments of a context path.
pub const PATH_SEPARATOR: char = '.';

/// Ordered key/value store shared by every task of a workflow.
///
/// Plain keys read the top level directly; dotted keys traverse nested
/// JSON objects, one segment at a time.
///
/// # Examples
///
/// ```
/// use hataori::Context;
/// use serde_json::json;
///
/// let mut ctx = Context::new();
/// ctx.insert("key1", json!({"key2": {"key3": "value4"}}));
///
/// assert_eq!(ctx.get("key1.key2.key3").unwrap(), &json!("value4"));
/// assert!(ctx.get("key1.key2.key5").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    data: IndexMap<String, Value>,
}

impl Context {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under a literal top-level key.
    ///
    /// The key is stored as written, dots included; it is not split.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Reads a value by plain key or dotted path.
    pub fn get(&self, path: &str) -> Result<&Value, WorkflowError> {
        if !path.contains(PATH_SEPARATOR) {
            return self.data.get(path).ok_or_else(|| missing(path, path));
        }

        let mut segments = path.split(PATH_SEPARATOR);
        let first = segments.next().unwrap_or(path);
        let mut current = self.data.get(first).ok_or_else(|| missing(path, first))?;
        for segment in segments {
            current = current
                .as_object()
                .and_then(|object| object.get(segment))
                .ok_or_else(|| missing(path, segment))?;
        }
        Ok(current)
    }

    /// Merges top-level keys: new keys are added, existing keys overwritten.
    pub fn update<K, I>(&mut self, entries: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        for (key, value) in entries {
            self.data.insert(key.into(), value);
        }
    }

    /// Removes a top-level key and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    /// Returns `true` if the path resolves to a value.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Returns an iterator over the top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Returns an iterator over the top-level entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Returns the number of top-level entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the context contains no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies the top level into a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.data
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl From<IndexMap<String, Value>> for Context {
    fn from(data: IndexMap<String, Value>) -> Self {
        Self { data }
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            data: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        ctx.update(iter);
        ctx
    }
}

fn missing(path: &str, segment: &str) -> WorkflowError {
    WorkflowError::KeyNotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}
