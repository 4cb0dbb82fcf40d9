//! Document envelope and identifiers
//!
//! Documents are JSON objects. The store owns four fields on each one:
//! `_id` plus the three lifecycle timestamps handled by [`envelope`].

pub mod envelope;
pub mod id;

use thiserror::Error;

pub use envelope::{
    parse_object, stamp, stamp_object, Timestamps, CREATED_AT, DELETED_AT, ID_FIELD, UPDATED_AT,
};
pub use id::{next_id, IdGenerator};

/// Payload could not be parsed or re-serialized as a JSON object
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Not well-formed JSON
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON, but not an object
    #[error("document must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
