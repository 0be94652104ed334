//! Typed-map representation of the deeply nested, partially schema-less
//! audit/event payloads (spec §9, "Dynamic nested records → typed maps").
//!
//! Expression compilation and evaluation (C2/C3) both walk `RecordValue`
//! trees rather than the verbatim JSON blob kept for storage/replay — this
//! is the one shared environment both the SQL-lowering backend and the
//! in-memory evaluator bind identifiers against.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Map(BTreeMap<String, RecordValue>),
    List(Vec<RecordValue>),
}

impl RecordValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RecordValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RecordValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            RecordValue::Double(d) => Some(*d),
            RecordValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RecordValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            RecordValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, RecordValue>> {
        match self {
            RecordValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Resolve a dotted path (`"objectRef.namespace"`) against a map value.
    pub fn get_path(&self, path: &str) -> Option<&RecordValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Stringify for template substitution (spec §4.3 summary templates).
    pub fn render(&self) -> String {
        match self {
            RecordValue::Null => String::new(),
            RecordValue::Bool(b) => b.to_string(),
            RecordValue::Int(i) => i.to_string(),
            RecordValue::Double(d) => d.to_string(),
            RecordValue::String(s) => s.clone(),
            RecordValue::Timestamp(t) => t.to_rfc3339(),
            RecordValue::Map(_) | RecordValue::List(_) => format!("{self}"),
        }
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Null => write!(f, "null"),
            RecordValue::Bool(b) => write!(f, "{b}"),
            RecordValue::Int(i) => write!(f, "{i}"),
            RecordValue::Double(d) => write!(f, "{d}"),
            RecordValue::String(s) => write!(f, "{s}"),
            RecordValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            RecordValue::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            RecordValue::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&RecordValue> for serde_json::Value {
    fn from(v: &RecordValue) -> Self {
        match v {
            RecordValue::Null => serde_json::Value::Null,
            RecordValue::Bool(b) => serde_json::Value::Bool(*b),
            RecordValue::Int(i) => serde_json::Value::Number((*i).into()),
            RecordValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            RecordValue::String(s) => serde_json::Value::String(s.clone()),
            RecordValue::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            RecordValue::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), serde_json::Value::from(v))).collect(),
            ),
            RecordValue::List(l) => {
                serde_json::Value::Array(l.iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

impl From<serde_json::Value> for RecordValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => RecordValue::Null,
            serde_json::Value::Bool(b) => RecordValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RecordValue::Int(i)
                } else {
                    RecordValue::Double(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => RecordValue::String(s),
            serde_json::Value::Array(a) => {
                RecordValue::List(a.into_iter().map(RecordValue::from).collect())
            }
            serde_json::Value::Object(o) => RecordValue::Map(
                o.into_iter()
                    .map(|(k, v)| (k, RecordValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Helper for hand-building maps when converting typed structs into the
/// evaluation environment (`AuditRecord` → `RecordValue::Map`, etc.).
pub struct MapBuilder(BTreeMap<String, RecordValue>);

impl MapBuilder {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn field(mut self, key: &str, value: RecordValue) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> RecordValue {
        RecordValue::Map(self.0)
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_path_resolves_nested_map() {
        let inner = MapBuilder::new()
            .field("namespace", RecordValue::String("production".into()))
            .build();
        let outer = MapBuilder::new().field("objectRef", inner).build();

        let resolved = outer.get_path("objectRef.namespace").unwrap();
        assert_eq!(resolved.as_str(), Some("production"));
    }

    #[test]
    fn get_path_missing_segment_is_none() {
        let outer = MapBuilder::new().build();
        assert!(outer.get_path("objectRef.namespace").is_none());
    }

    #[test]
    fn json_conversion_preserves_ints() {
        let v: RecordValue = serde_json::json!({"count": 5}).into();
        assert_eq!(v.get_path("count").unwrap().as_int(), Some(5));
    }
}
