use std::collections::BTreeMap;

use serde_json::{Number, Value};

/// A single field value as the time-series sink stores it
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl FieldValue {
    /// Scalars map onto field values; `null`, arrays and objects have no representation
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::from_number(n)),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::String(s) => Some(FieldValue::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Integers stay integers so a series keeps a stable field type
    pub fn from_number(n: &Number) -> Self {
        match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        }
    }
}

pub type Fields = BTreeMap<String, FieldValue>;
pub type Tags = BTreeMap<String, String>;

/// One timestamped, tagged record bound for a named series
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Tags,
    /// Epoch seconds
    pub time: i64,
    pub fields: Fields,
}

impl Point {
    pub fn new(measurement: impl Into<String>, time: i64) -> Self {
        Point {
            measurement: measurement.into(),
            tags: Tags::new(),
            time,
            fields: Fields::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}
