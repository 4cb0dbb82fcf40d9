//! Offset-based pagination over the timestamp indexes
//!
//! A continuation token is the decimal scan offset into an index. Offsets
//! are positional: documents inserted ahead of the offset between two calls
//! shift later entries onto the next page.

use serde::Serialize;
use serde_json::Value;

use crate::document::{CREATED_AT, DELETED_AT, UPDATED_AT};
use crate::engine::ReadTx;

use super::errors::{StoreError, StoreResult};

/// Which lifecycle timestamp a listing follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeline {
    #[default]
    Created,
    Updated,
    Deleted,
}

impl Timeline {
    pub const ALL: [Timeline; 3] = [Timeline::Created, Timeline::Updated, Timeline::Deleted];

    /// Name of the global index, which is also the JSON field it orders by
    pub fn index_name(&self) -> &'static str {
        match self {
            Timeline::Created => CREATED_AT,
            Timeline::Updated => UPDATED_AT,
            Timeline::Deleted => DELETED_AT,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub documents: Vec<Value>,
    /// Offset of the following page; unchanged scans past the end yield
    /// empty pages.
    pub next_token: String,
}

/// Parses a continuation token. The empty token is offset 0.
pub fn parse_token(token: &str) -> StoreResult<usize> {
    if token.is_empty() {
        return Ok(0);
    }
    token
        .parse::<usize>()
        .map_err(|_| StoreError::InvalidToken(token.to_string()))
}

/// Collects one page from `timeline`, skipping `offset` entries.
pub(crate) fn collect_page(
    tx: &ReadTx<'_>,
    timeline: Timeline,
    offset: usize,
    page_size: usize,
) -> StoreResult<Page> {
    let mut documents = Vec::with_capacity(page_size.min(1024));
    let mut skipped = 0usize;
    let mut decode_error = None;

    if page_size > 0 {
        tx.ascend(timeline.index_name(), |_, value| {
            if skipped < offset {
                skipped += 1;
                return true;
            }
            match serde_json::from_str::<Value>(value) {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    decode_error = Some(e);
                    return false;
                }
            }
            documents.len() < page_size
        })?;
    }

    if let Some(e) = decode_error {
        return Err(StoreError::Encoding(e.into()));
    }

    Ok(Page {
        documents,
        next_token: offset.saturating_add(page_size).to_string(),
    })
}
