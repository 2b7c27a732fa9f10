use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

/// A JSON-like value that the sanitizers operate on.
///
/// `SanitizableValue` is the explicit tagged form of whatever the framework
/// parsed out of the request. Every transform in this crate preserves its
/// shape: arrays keep their length and order, maps keep their keys (except
/// where the NoSQL filter drops an operator key), and only `String` leaves
/// are rewritten.
///
/// Conversion to and from [`serde_json::Value`] is lossless, so adapters can
/// parse with `serde_json`, sanitize, and hand the value back.
///
/// # Examples
///
/// ```
/// use sanitize_core::SanitizableValue;
/// use serde_json::json;
///
/// let value = SanitizableValue::from(json!({"name": "Ada", "tags": ["x", 1]}));
/// assert_eq!(value.get("name").and_then(|v| v.as_str()), Some("Ada"));
/// assert_eq!(serde_json::Value::from(value), json!({"name": "Ada", "tags": ["x", 1]}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum SanitizableValue {
    /// JSON `null`, also used for an absent request part
    #[default]
    Null,
    /// A boolean
    Bool(bool),
    /// A number, kept exactly as parsed
    Number(Number),
    /// A string leaf, the only thing the text filters rewrite
    String(String),
    /// An ordered sequence
    Array(Vec<SanitizableValue>),
    /// A string-keyed map
    Map(BTreeMap<String, SanitizableValue>),
}

impl SanitizableValue {
    /// Creates an empty map value.
    pub fn empty_map() -> Self {
        SanitizableValue::Map(BTreeMap::new())
    }

    /// Returns `true` for `null`, an empty string, an empty array and an empty map.
    ///
    /// Request-part sanitizers skip empty parts.
    pub fn is_empty(&self) -> bool {
        match self {
            SanitizableValue::Null => true,
            SanitizableValue::String(s) => s.is_empty(),
            SanitizableValue::Array(items) => items.is_empty(),
            SanitizableValue::Map(map) => map.is_empty(),
            SanitizableValue::Bool(_) | SanitizableValue::Number(_) => false,
        }
    }

    /// Returns `true` if this value is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, SanitizableValue::Null)
    }

    /// Returns the string slice if this is a `String` leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SanitizableValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner map if this is a `Map`.
    pub fn as_map(&self) -> Option<&BTreeMap<String, SanitizableValue>> {
        match self {
            SanitizableValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the inner map mutably if this is a `Map`.
    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, SanitizableValue>> {
        match self {
            SanitizableValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the inner array if this is an `Array`.
    pub fn as_array(&self) -> Option<&Vec<SanitizableValue>> {
        match self {
            SanitizableValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&SanitizableValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Short name of the variant, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SanitizableValue::Null => "null",
            SanitizableValue::Bool(_) => "bool",
            SanitizableValue::Number(_) => "number",
            SanitizableValue::String(_) => "string",
            SanitizableValue::Array(_) => "array",
            SanitizableValue::Map(_) => "map",
        }
    }

    /// Number of bytes this value occupies when serialized as compact JSON.
    ///
    /// `Null` counts as zero because it stands in for an absent request
    /// part. The length is counted without building the JSON string.
    pub fn serialized_len(&self) -> Result<usize, serde_json::Error> {
        if self.is_null() {
            return Ok(0);
        }
        let mut counter = ByteCounter(0);
        serde_json::to_writer(&mut counter, self)?;
        Ok(counter.0)
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'de> Deserialize<'de> for SanitizableValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(SanitizableValue::from)
    }
}

impl From<serde_json::Value> for SanitizableValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SanitizableValue::Null,
            serde_json::Value::Bool(b) => SanitizableValue::Bool(b),
            serde_json::Value::Number(n) => SanitizableValue::Number(n),
            serde_json::Value::String(s) => SanitizableValue::String(s),
            serde_json::Value::Array(items) => {
                SanitizableValue::Array(items.into_iter().map(SanitizableValue::from).collect())
            }
            serde_json::Value::Object(map) => SanitizableValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, SanitizableValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<SanitizableValue> for serde_json::Value {
    fn from(value: SanitizableValue) -> Self {
        match value {
            SanitizableValue::Null => serde_json::Value::Null,
            SanitizableValue::Bool(b) => serde_json::Value::Bool(b),
            SanitizableValue::Number(n) => serde_json::Value::Number(n),
            SanitizableValue::String(s) => serde_json::Value::String(s),
            SanitizableValue::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            SanitizableValue::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for SanitizableValue {
    fn from(s: &str) -> Self {
        SanitizableValue::String(s.to_string())
    }
}

impl From<String> for SanitizableValue {
    fn from(s: String) -> Self {
        SanitizableValue::String(s)
    }
}

impl From<bool> for SanitizableValue {
    fn from(b: bool) -> Self {
        SanitizableValue::Bool(b)
    }
}

impl From<i64> for SanitizableValue {
    fn from(n: i64) -> Self {
        SanitizableValue::Number(Number::from(n))
    }
}

impl From<u64> for SanitizableValue {
    fn from(n: u64) -> Self {
        SanitizableValue::Number(Number::from(n))
    }
}

impl From<Vec<SanitizableValue>> for SanitizableValue {
    fn from(items: Vec<SanitizableValue>) -> Self {
        SanitizableValue::Array(items)
    }
}

impl From<BTreeMap<String, SanitizableValue>> for SanitizableValue {
    fn from(map: BTreeMap<String, SanitizableValue>) -> Self {
        SanitizableValue::Map(map)
    }
}

impl FromIterator<(String, SanitizableValue)> for SanitizableValue {
    fn from_iter<I: IntoIterator<Item = (String, SanitizableValue)>>(iter: I) -> Self {
        SanitizableValue::Map(iter.into_iter().collect())
    }
}
