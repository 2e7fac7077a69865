//! Snapshot records from the local archive
//!
//! A snapshot is kept as an opaque JSON value: only the cursor token, the
//! batch tag and the timestamp fields are interpreted, everything else is
//! forwarded to the remote service untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single archive record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    record: Value,
}

impl Snapshot {
    /// Wrap a raw record
    pub fn new(record: Value) -> Self {
        Self { record }
    }

    /// Borrow the raw record
    pub fn as_value(&self) -> &Value {
        &self.record
    }

    /// Unwrap the raw record
    pub fn into_value(self) -> Value {
        self.record
    }

    /// Cursor token used for pagination
    pub fn uuid(&self) -> Option<&str> {
        self.record.get("uuid").and_then(Value::as_str)
    }

    /// Value of `snapshot.tags.<tag>.v`
    pub fn tag_value(&self, tag: &str) -> Option<&Value> {
        self.record
            .get("snapshot")
            .and_then(|s| s.get("tags"))
            .and_then(|t| t.get(tag))
            .and_then(|t| t.get("v"))
    }

    /// Top-level `timestamp` field
    pub fn timestamp(&self) -> Option<&Value> {
        self.record.get("timestamp")
    }

    /// Nested `snapshot.ts` field
    pub fn inner_timestamp(&self) -> Option<&Value> {
        self.record.get("snapshot").and_then(|s| s.get("ts"))
    }

    /// Return a copy of this record with the top-level timestamp replaced
    pub fn with_timestamp(&self, timestamp: impl Into<String>) -> Snapshot {
        let mut record = self.record.clone();
        if let Some(obj) = record.as_object_mut() {
            obj.insert("timestamp".to_string(), Value::String(timestamp.into()));
        }
        Snapshot { record }
    }
}

impl From<Value> for Snapshot {
    fn from(record: Value) -> Self {
        Snapshot::new(record)
    }
}

/// Coerce a listing response into a sequence of records
///
/// Arrays are used as is, `null` yields nothing and any other value is
/// treated as a single record.
pub fn records_from_page(page: Value) -> Vec<Snapshot> {
    match page {
        Value::Array(items) => items.into_iter().map(Snapshot::new).collect(),
        Value::Null => Vec::new(),
        other => vec![Snapshot::new(other)],
    }
}

/// JavaScript-style truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
