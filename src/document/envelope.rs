//! Lifecycle timestamp envelope
//!
//! Every stored document carries `created_at`, `updated_at` and `deleted_at`
//! (Unix seconds, 0 meaning "never"). Stamping overwrites all three and
//! leaves every other field alone, so callers read whatever they want to
//! preserve first:
//!
//! ```ignore
//! let ts = Timestamps::read(&existing).updated(now);
//! stamp_object(&mut replacement, ts);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::EncodingError;

/// Identifier field
pub const ID_FIELD: &str = "_id";
/// Creation time field
pub const CREATED_AT: &str = "created_at";
/// Last update time field
pub const UPDATED_AT: &str = "updated_at";
/// Soft delete time field
pub const DELETED_AT: &str = "deleted_at";

/// The three lifecycle timestamps of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: i64,
}

impl Timestamps {
    /// Envelope for a freshly created document
    pub fn created(now: i64) -> Self {
        Self {
            created_at: now,
            updated_at: 0,
            deleted_at: 0,
        }
    }

    /// Reads the envelope of a stored document.
    ///
    /// Missing or non-numeric fields read as 0; fractional values truncate.
    pub fn read(doc: &Value) -> Self {
        match doc {
            Value::Object(map) => Self::from_object(map),
            _ => Self::default(),
        }
    }

    /// Same as [`Timestamps::read`] for an already unwrapped object.
    pub fn from_object(doc: &Map<String, Value>) -> Self {
        fn field(doc: &Map<String, Value>, name: &str) -> i64 {
            match doc.get(name) {
                Some(Value::Number(n)) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f as i64))
                    .unwrap_or(0),
                _ => 0,
            }
        }

        Self {
            created_at: field(doc, CREATED_AT),
            updated_at: field(doc, UPDATED_AT),
            deleted_at: field(doc, DELETED_AT),
        }
    }

    /// Same creation and deletion, update stamped at `now`
    pub fn updated(self, now: i64) -> Self {
        Self {
            updated_at: now,
            ..self
        }
    }

    /// Same creation and update, deletion stamped at `now`
    pub fn deleted(self, now: i64) -> Self {
        Self {
            deleted_at: now,
            ..self
        }
    }

    /// Whether the document has been soft deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at != 0
    }
}

/// Parses a payload that must be a JSON object.
pub fn parse_object(payload: &str) -> Result<Map<String, Value>, EncodingError> {
    match serde_json::from_str::<Value>(payload)? {
        Value::Object(map) => Ok(map),
        other => Err(EncodingError::NotAnObject(json_type(&other))),
    }
}

/// Sets all three timestamp fields on `doc`.
pub fn stamp_object(doc: &mut Map<String, Value>, ts: Timestamps) {
    doc.insert(CREATED_AT.to_string(), Value::from(ts.created_at));
    doc.insert(UPDATED_AT.to_string(), Value::from(ts.updated_at));
    doc.insert(DELETED_AT.to_string(), Value::from(ts.deleted_at));
}

/// Stamps a serialized document and returns the serialized result.
pub fn stamp(payload: &str, ts: Timestamps) -> Result<String, EncodingError> {
    let mut doc = parse_object(payload)?;
    stamp_object(&mut doc, ts);
    Ok(serde_json::to_string(&doc)?)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
