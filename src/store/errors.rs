//! Store error types

use thiserror::Error;

use crate::document::EncodingError;
use crate::engine::EngineError;

/// Errors returned by `DocumentStore` operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {id:?} not found in collection {collection:?}")]
    NotFound { collection: String, id: String },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("invalid continuation token {0:?}: expected a non-negative integer")]
    InvalidToken(String),

    #[error("invalid collection name {0:?}: must be non-empty without ':', '*' or '?'")]
    InvalidCollection(String),

    #[error(transparent)]
    Store(#[from] EngineError),
}

impl StoreError {
    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Maps an engine not-found on a document key to `NotFound`.
    pub(crate) fn from_lookup(err: EngineError, collection: &str, id: &str) -> Self {
        if err.is_not_found() {
            Self::not_found(collection, id)
        } else {
            StoreError::Store(err)
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "DOCSTORE_NOT_FOUND",
            StoreError::Encoding(_) => "DOCSTORE_ENCODING",
            StoreError::InvalidToken(_) => "DOCSTORE_INVALID_TOKEN",
            StoreError::InvalidCollection(_) => "DOCSTORE_INVALID_COLLECTION",
            StoreError::Store(e) => e.code().code(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Whether the store handle should be abandoned
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Store(e) if e.is_fatal())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
