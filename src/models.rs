//! Core data models used throughout the pipeline.
//!
//! Records flow from a dataset into [`RawRecord`]s, are normalized into
//! [`Record`]s, rendered into [`Document`]s for indexing, and come back out
//! of retrieval as a [`ContextBundle`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar metadata value. Coerced once when a record is read and never
/// re-coerced downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Cell values treated as absent, matching common spreadsheet exports.
const MISSING_MARKERS: [&str; 6] = ["", "nan", "na", "n/a", "null", "none"];

impl MetaValue {
    /// Coerce a raw text cell: integer, then float, then boolean, else string.
    /// Returns `None` for empty or missing-value markers.
    pub fn parse(raw: &str) -> Option<MetaValue> {
        let trimmed = raw.trim();
        if MISSING_MARKERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
            return None;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Some(MetaValue::Int(i));
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Some(MetaValue::Float(f));
            }
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Some(MetaValue::Bool(true)),
            "false" => Some(MetaValue::Bool(false)),
            _ => Some(MetaValue::Str(trimmed.to_string())),
        }
    }

    /// Coerce a JSON value. Nested arrays and objects are stringified.
    pub fn from_json(value: &serde_json::Value) -> Option<MetaValue> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(MetaValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(MetaValue::Int(i)),
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .map(MetaValue::Float)
                    .or_else(|| Some(MetaValue::Str(n.to_string()))),
            },
            Value::String(s) => Some(MetaValue::Str(s.clone())),
            other => Some(MetaValue::Str(other.to_string())),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Float(x) => write!(f, "{}", x),
            MetaValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        MetaValue::Int(i)
    }
}

impl From<f64> for MetaValue {
    fn from(x: f64) -> Self {
        MetaValue::Float(x)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

/// Flat metadata mapping, ordered by key so serialization is stable.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A row exactly as read from a source, before key normalization.
/// `None` marks a missing value.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub position: usize,
    pub fields: Vec<(String, Option<MetaValue>)>,
}

impl RawRecord {
    pub fn new<K, I>(position: usize, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<MetaValue>)>,
    {
        Self {
            position,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A normalized record: canonical keys, every value present.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub position: usize,
    pub fields: Metadata,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.fields.get(key)
    }
}

/// Searchable rendering of one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// Query-scoped, ordered retrieval result. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBundle {
    passages: Vec<String>,
}

impl ContextBundle {
    pub const SEPARATOR: &'static str = "\n\n";

    pub fn new(passages: Vec<String>) -> Self {
        Self { passages }
    }

    /// Passages in decreasing similarity order.
    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// The concatenated context. Empty string when nothing was retrieved.
    pub fn text(&self) -> String {
        self.passages.join(Self::SEPARATOR)
    }
}

impl fmt::Display for ContextBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
