//! Lazily initialized collections
//!
//! A collection comes into existence on its first write. Initialization
//! creates the collection's `_id` index exactly once per store handle, even
//! when several threads race on the same new collection.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::document::ID_FIELD;
use crate::engine::{Db, EngineErrorCode, EngineResult, IndexKind};
use crate::observability::{log_event, Event, Logger};

/// Name of the per-collection id index
pub fn id_index_name(collection: &str) -> String {
    format!("{}:{}", collection, ID_FIELD)
}

/// Key pattern covering every document of `collection`
pub fn collection_pattern(collection: &str) -> String {
    format!("{}:*", collection)
}

/// Set of collections whose indexes exist in the engine
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    initialized: RwLock<HashSet<String>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self, collection: &str) -> bool {
        // The set is only ever grown by whole inserts.
        self.initialized
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(collection)
    }

    /// Number of initialized collections
    pub fn len(&self) -> usize {
        self.initialized
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates the collection's id index unless this handle already did.
    ///
    /// Returns true when this call performed the initialization. On error the
    /// collection stays unmarked and the next call retries.
    pub fn ensure_initialized(&self, db: &Db, collection: &str) -> EngineResult<bool> {
        if self.is_initialized(collection) {
            return Ok(false);
        }

        let mut initialized = self
            .initialized
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if initialized.contains(collection) {
            return Ok(false);
        }

        let name = id_index_name(collection);
        match db.create_index(
            &name,
            &collection_pattern(collection),
            IndexKind::json(ID_FIELD),
        ) {
            Ok(()) => {}
            Err(e) if e.code() == EngineErrorCode::IndexExists => {}
            Err(e) => {
                Logger::warn(
                    Event::CollectionInitFailed.as_str(),
                    &[("collection", collection), ("error", &e.to_string())],
                );
                return Err(e);
            }
        }

        initialized.insert(collection.to_string());
        log_event(
            Event::CollectionInitialized,
            &[("collection", collection), ("index", &name)],
        );
        Ok(true)
    }
}
