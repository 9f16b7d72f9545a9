use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A stored record of one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Map<String, Value>,
    pub embedding: Option<Vec<f32>>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Sets the record timestamp and mirrors it into the `timestamp` field
    /// as unix seconds, where scalar lookups find it.
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self.fields.insert(
            "timestamp".to_string(),
            Value::from(at.timestamp_millis() as f64 / 1000.0),
        );
        self
    }

    /// Numeric value of `field`. RFC 3339 strings read as unix seconds.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.timestamp_millis() as f64 / 1000.0),
            _ => None,
        }
    }
}
