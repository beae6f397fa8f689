//! Data models for collected device profiles.
//!
//! This module contains the document types that flow between probes,
//! the aggregator and the caller: a closed [`Value`] union, the per-probe
//! [`PartialDocument`] and the per-round [`MergedDocument`].

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One probe's findings, keyed by attribute name.
///
/// An empty document means the probe has nothing to contribute.
pub type PartialDocument = BTreeMap<String, Value>;

/// A JSON-compatible value reported by a probe.
///
/// Unlike `serde_json::Value` there is no null variant: a probe that has
/// no value for a key leaves the key out. For the same reason a `Float`
/// must be finite to serialize, since JSON would turn NaN and infinities
/// into `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// Nested mapping.
    Map(PartialDocument),
}

impl Value {
    /// Returns the string slice if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int` value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the integer if this is a non-negative `Int` or a `UInt`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(n) => u64::try_from(*n).ok(),
            Value::UInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the flag if this is a `Bool` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the nested mapping if this is a `Map` value.
    pub fn as_map(&self) -> Option<&PartialDocument> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Float(n) => Err(S::Error::custom(format!(
                "non-finite number {} has no JSON representation",
                n
            ))),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            // Non-finite floats: show them rather than fail the formatter.
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(Value::UInt(n), Value::Int)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::from(n as u64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<PartialDocument> for Value {
    fn from(map: PartialDocument) -> Self {
        Value::Map(map)
    }
}

/// Builds a [`PartialDocument`] from `key => value` pairs.
///
/// ```
/// let doc = devprofile::document! { "os" => "linux", "cpus" => 8 };
/// assert_eq!(doc.len(), 2);
/// ```
#[macro_export]
macro_rules! document {
    () => { $crate::models::PartialDocument::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::models::PartialDocument::new();
        $( doc.insert(::std::string::String::from($key), $crate::models::Value::from($value)); )+
        doc
    }};
}

/// The result of one collection round: every non-empty probe result,
/// keyed by probe name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedDocument(BTreeMap<String, PartialDocument>);

impl MergedDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a probe's contribution, replacing any earlier one under the same name.
    pub fn insert(&mut self, probe: impl Into<String>, partial: PartialDocument) {
        self.0.insert(probe.into(), partial);
    }

    /// Returns the contribution of the named probe.
    pub fn get(&self, probe: &str) -> Option<&PartialDocument> {
        self.0.get(probe)
    }

    /// Whether the named probe contributed.
    pub fn contains(&self, probe: &str) -> bool {
        self.0.contains_key(probe)
    }

    /// Number of contributing probes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no probe contributed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Contributing probe names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Consumes the document, returning the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, PartialDocument> {
        self.0
    }

    /// Nests every contribution as a `Map` value so the whole round can be
    /// reported as a single probe result.
    pub fn into_partial(self) -> PartialDocument {
        self.0
            .into_iter()
            .map(|(name, partial)| (name, Value::Map(partial)))
            .collect()
    }

    /// Serializes to compact JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serializes to indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<BTreeMap<String, PartialDocument>> for MergedDocument {
    fn from(map: BTreeMap<String, PartialDocument>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, PartialDocument)> for MergedDocument {
    fn from_iter<I: IntoIterator<Item = (String, PartialDocument)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
