//! Typed key/value container used to build INSERT statements.
//!
//! A [`ContentValues`] maps column names to [`Value`]s. Putting a key that is
//! already present replaces its value, so every key appears exactly once.
//! Values are stored in their original storage class and converted lazily by
//! the `get_as_*` accessors.
//!
//! ```
//! use contentdb_core::{ContentValues, DataType};
//!
//! let mut values = ContentValues::new();
//! values.put_integer("x", 1970);
//! values.put_string("y", "seven");
//!
//! assert_eq!(values.type_for_key("x"), Some(DataType::Integer));
//! assert_eq!(values.get_as_text("x"), "1970");
//! assert_eq!(values.get_as_integer("missing"), 0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{DataType, Value};

/// An ordered mapping from column names to typed values.
///
/// Keys iterate in lexicographic order. The order carries no meaning for
/// callers; it only makes generated SQL deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentValues {
    entries: BTreeMap<String, Value>,
}

impl ContentValues {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key` with any value convertible into [`Value`].
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Insert or replace `key` with an integer.
    pub fn put_integer(&mut self, key: impl Into<String>, value: i64) {
        self.put(key, Value::Integer(value));
    }

    /// Insert or replace `key` with a real.
    pub fn put_real(&mut self, key: impl Into<String>, value: f64) {
        self.put(key, Value::Real(value));
    }

    /// Insert or replace `key` with text.
    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.put(key, Value::Text(value.into()));
    }

    /// Insert or replace `key` with a blob.
    pub fn put_blob(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.put(key, Value::Blob(value.into()));
    }

    /// Insert or replace `key` with an explicit NULL.
    pub fn put_null(&mut self, key: impl Into<String>) {
        self.put(key, Value::Null);
    }

    /// Whether `key` has been put since the last [`clear`](Self::clear).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Storage class of the value under `key`, or `None` if absent.
    pub fn type_for_key(&self, key: &str) -> Option<DataType> {
        self.entries.get(key).map(Value::data_type)
    }

    /// The stored value under `key`, uncoerced.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// All keys, each exactly once.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff no keys are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The value under `key` coerced to an integer; 0 if absent.
    pub fn get_as_integer(&self, key: &str) -> i64 {
        self.entries.get(key).map_or(0, Value::to_integer)
    }

    /// The value under `key` coerced to a real; 0.0 if absent.
    pub fn get_as_real(&self, key: &str) -> f64 {
        self.entries.get(key).map_or(0.0, Value::to_real)
    }

    /// The value under `key` coerced to text; empty if absent.
    ///
    /// Blob bytes that are not valid UTF-8 are replaced with U+FFFD. Use
    /// [`get_as_text_bytes`](Self::get_as_text_bytes) for the exact bytes.
    pub fn get_as_text(&self, key: &str) -> String {
        self.entries.get(key).map(Value::to_text).unwrap_or_default()
    }

    /// The text form of the value under `key` as raw bytes; empty if absent.
    /// Blobs pass through unchanged.
    pub fn get_as_text_bytes(&self, key: &str) -> Vec<u8> {
        self.entries.get(key).map(Value::to_text_bytes).unwrap_or_default()
    }

    /// The bytes of the blob under `key`; empty if absent or not a blob.
    pub fn get_as_blob(&self, key: &str) -> Vec<u8> {
        self.entries.get(key).map(Value::to_blob).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ContentValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        values.extend(iter);
        values
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for ContentValues {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}
