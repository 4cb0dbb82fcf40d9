//! Ordered secondary indexes
//!
//! An index covers every key matching its glob pattern and orders those keys
//! by a value derived from the stored value. Entries are `(IndexKey, seq, key)`
//! triples in a `BTreeSet`, so ties between equal index values fall back to
//! the key's insertion sequence: the order in which keys first appeared.

use std::collections::BTreeSet;
use std::ops::Bound;

use serde_json::Value;

use super::pattern;

/// Index key derived from a stored value.
///
/// Ordering is deterministic: Missing < Bool < Int < Float < String.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Field absent, null, or not a scalar
    Missing,
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a float
    ///
    /// Uses bit representation for total ordering.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a JSON value
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(b)) => IndexKey::Bool(*b),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    IndexKey::Int(i)
                } else if let Some(f) = n.as_f64() {
                    IndexKey::from_float(f)
                } else {
                    IndexKey::Missing
                }
            }
            Some(Value::String(s)) => IndexKey::String(s.clone()),
            _ => IndexKey::Missing,
        }
    }
}

/// How an index derives its ordering value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexKind {
    /// Top-level field of a JSON object value
    Json(String),
    /// The raw stored string
    String,
}

impl IndexKind {
    /// Ordering JSON field shorthand
    pub fn json(field: impl Into<String>) -> Self {
        IndexKind::Json(field.into())
    }

    /// Whether deriving a key needs the parsed JSON value
    pub fn needs_json(&self) -> bool {
        matches!(self, IndexKind::Json(_))
    }

    /// Derives the index key for a stored value.
    ///
    /// `parsed` is the value already parsed as JSON, if it parses.
    pub fn key_for(&self, raw: &str, parsed: Option<&Value>) -> IndexKey {
        match self {
            IndexKind::Json(field) => IndexKey::from_json(parsed.and_then(|v| v.get(field))),
            IndexKind::String => IndexKey::String(raw.to_string()),
        }
    }
}

type IndexEntry = (IndexKey, u64, String);

/// A single named index
#[derive(Debug)]
pub struct Index {
    name: String,
    pattern: String,
    kind: IndexKind,
    entries: BTreeSet<IndexEntry>,
}

impl Index {
    /// Creates a new empty index
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            kind,
            entries: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> &IndexKind {
        &self.kind
    }

    /// Whether this index covers `key`
    pub fn covers(&self, key: &str) -> bool {
        pattern::matches(&self.pattern, key)
    }

    pub fn insert(&mut self, index_key: IndexKey, seq: u64, key: &str) {
        self.entries.insert((index_key, seq, key.to_string()));
    }

    pub fn remove(&mut self, index_key: IndexKey, seq: u64, key: &str) {
        self.entries.remove(&(index_key, seq, key.to_string()));
    }

    /// All covered keys in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(_, _, key)| key.as_str())
    }

    /// Covered keys whose index value is `>= pivot`, ascending
    pub fn iter_from(&self, pivot: &IndexKey) -> impl Iterator<Item = &str> + '_ {
        let start: Bound<IndexEntry> = Bound::Included((pivot.clone(), 0, String::new()));
        self.entries
            .range((start, Bound::Unbounded))
            .map(|(_, _, key)| key.as_str())
    }

    /// Number of covered keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
