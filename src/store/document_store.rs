//! Document store over the embedded engine
//!
//! Documents live under the key `<collection>:<id>`. Each operation is one
//! engine transaction, so it either fully applies or leaves no trace.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::document::{
    next_id, parse_object, stamp_object, EncodingError, Timestamps, ID_FIELD,
};
use crate::engine::{has_wildcards, Db, EngineOptions, IndexKind, OpenReport, MEMORY};
use crate::observability::{log_event, trace_event, Event, Logger};

use super::cursor::{collect_page, parse_token, Page, Timeline};
use super::errors::{StoreError, StoreResult};
use super::registry::{id_index_name, CollectionRegistry};

/// Source of "now" in Unix seconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Where and how to open a store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `:memory:` or a log file path
    pub connection: String,
    pub engine: EngineOptions,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connection: MEMORY.to_string(),
            engine: EngineOptions::default(),
        }
    }
}

impl StoreConfig {
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            ..Self::default()
        }
    }
}

/// Key under which a document is stored
pub fn document_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

/// Rejects names that would collide with the key separator or index globs.
pub fn validate_collection(collection: &str) -> StoreResult<()> {
    if collection.is_empty() || collection.contains(':') || has_wildcards(collection) {
        return Err(StoreError::InvalidCollection(collection.to_string()));
    }
    Ok(())
}

pub struct DocumentStore {
    db: Db,
    registry: CollectionRegistry,
    clock: Clock,
    connection: String,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("connection", &self.connection)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Opens a store with default engine options.
    pub fn open(connection: &str) -> StoreResult<Self> {
        Self::open_with(StoreConfig::new(connection))
    }

    /// Opens the engine and creates the three global timestamp indexes.
    pub fn open_with(config: StoreConfig) -> StoreResult<Self> {
        let db = Db::open_with(&config.connection, config.engine)?;

        for timeline in Timeline::ALL {
            let field = timeline.index_name();
            db.create_index(field, "*", IndexKind::json(field))?;
        }

        let report = db.open_report().clone();
        log_open(&config.connection, &report);

        Ok(Self {
            db,
            registry: CollectionRegistry::new(),
            clock: Arc::new(|| Utc::now().timestamp()),
            connection: config.connection,
        })
    }

    /// Replaces the wall clock, mostly for tests.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// The underlying engine handle
    pub fn db(&self) -> &Db {
        &self.db
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Stores `payload` as a new document and returns its id.
    ///
    /// Any `_id` or timestamp fields in the payload are overwritten.
    pub fn create(&self, collection: &str, payload: &str) -> StoreResult<String> {
        validate_collection(collection)?;
        let mut doc = parse_object(payload)?;

        self.registry.ensure_initialized(&self.db, collection)?;

        let id = next_id();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        stamp_object(&mut doc, Timestamps::created(self.now()));
        let body = encode(&doc)?;

        let key = document_key(collection, &id);
        self.db.update(|tx| {
            tx.set(&key, body);
            Ok::<_, StoreError>(())
        })?;

        trace_event(
            Event::DocumentCreated,
            &[("collection", collection), ("id", &id)],
        );
        Ok(id)
    }

    /// Returns the stored document, soft-deleted or not.
    pub fn read(&self, collection: &str, id: &str) -> StoreResult<Value> {
        validate_collection(collection)?;
        if id.is_empty() {
            return Err(StoreError::not_found(collection, id));
        }

        let key = document_key(collection, id);
        self.db.view(|tx| {
            let raw = tx
                .get(&key)
                .map_err(|e| StoreError::from_lookup(e, collection, id))?;
            Ok(serde_json::from_str(raw).map_err(EncodingError::from)?)
        })
    }

    /// Replaces the body of an existing document with `payload`.
    ///
    /// `_id`, `created_at` and `deleted_at` are kept; `updated_at` moves to
    /// now, never backwards.
    pub fn update(&self, collection: &str, id: &str, payload: &str) -> StoreResult<()> {
        validate_collection(collection)?;
        let mut doc = parse_object(payload)?;
        if id.is_empty() {
            return Err(StoreError::not_found(collection, id));
        }

        let key = document_key(collection, id);
        let now = self.now();
        self.db.update(|tx| {
            let ts = {
                let raw = tx
                    .get(&key)
                    .map_err(|e| StoreError::from_lookup(e, collection, id))?;
                Timestamps::from_object(&parse_object(raw)?)
            };

            doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            stamp_object(&mut doc, ts.updated(now.max(ts.updated_at)));
            tx.set(&key, encode(&doc)?);
            Ok::<_, StoreError>(())
        })?;

        trace_event(
            Event::DocumentUpdated,
            &[("collection", collection), ("id", id)],
        );
        Ok(())
    }

    /// Deletes a document.
    ///
    /// A soft delete stamps `deleted_at` and keeps the document readable and
    /// listed; deleting an already soft-deleted document changes nothing.
    /// A permanent delete removes the key and its index entries.
    pub fn delete(&self, collection: &str, id: &str, permanent: bool) -> StoreResult<()> {
        validate_collection(collection)?;
        if id.is_empty() {
            return Err(StoreError::not_found(collection, id));
        }

        let key = document_key(collection, id);
        if permanent {
            self.db.update(|tx| {
                tx.delete(&key)
                    .map_err(|e| StoreError::from_lookup(e, collection, id))?;
                Ok::<_, StoreError>(())
            })?;
            trace_event(
                Event::DocumentPurged,
                &[("collection", collection), ("id", id)],
            );
            return Ok(());
        }

        let now = self.now();
        self.db.update(|tx| {
            let mut doc = {
                let raw = tx
                    .get(&key)
                    .map_err(|e| StoreError::from_lookup(e, collection, id))?;
                parse_object(raw)?
            };
            let ts = Timestamps::from_object(&doc);
            if ts.is_deleted() {
                return Ok(());
            }

            stamp_object(&mut doc, ts.deleted(now));
            tx.set(&key, encode(&doc)?);
            Ok::<_, StoreError>(())
        })?;

        trace_event(
            Event::DocumentDeleted,
            &[("collection", collection), ("id", id)],
        );
        Ok(())
    }

    /// Lists documents of every collection by creation time.
    pub fn list(&self, page_size: usize, token: &str) -> StoreResult<Page> {
        self.list_by(Timeline::Created, page_size, token)
    }

    /// Lists documents of every collection along `timeline`.
    ///
    /// Documents that were never updated (or deleted) sort first on the
    /// `Updated` (or `Deleted`) timeline, with a zero timestamp.
    pub fn list_by(&self, timeline: Timeline, page_size: usize, token: &str) -> StoreResult<Page> {
        let offset = parse_token(token)?;
        let page = self
            .db
            .view(|tx| collect_page(tx, timeline, offset, page_size))?;

        trace_event(
            Event::PageListed,
            &[
                ("index", timeline.index_name()),
                ("returned", &page.documents.len().to_string()),
                ("token", token),
            ],
        );
        Ok(page)
    }

    /// Ids in one collection, in id order (which is creation order).
    pub fn collection_ids(&self, collection: &str) -> StoreResult<Vec<String>> {
        validate_collection(collection)?;
        self.registry.ensure_initialized(&self.db, collection)?;

        let prefix_len = collection.len() + 1;
        self.db.view(|tx| {
            let mut ids = Vec::new();
            tx.ascend(&id_index_name(collection), |key, _| {
                ids.push(key[prefix_len..].to_string());
                true
            })?;
            Ok(ids)
        })
    }

    /// Number of stored documents across all collections
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.db.view(|tx| Ok::<_, StoreError>(tx.len()))?)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Compacts the log file down to the live documents.
    pub fn shrink(&self) -> StoreResult<()> {
        let before = self.db.log_size()?;
        self.db.shrink()?;
        let after = self.db.log_size()?;
        log_event(
            Event::LogShrunk,
            &[
                ("bytes_after", &after.to_string()),
                ("bytes_before", &before.to_string()),
                ("db", &self.connection),
            ],
        );
        Ok(())
    }

    /// Flushes and releases the engine. Safe to call more than once.
    pub fn close(&self) -> StoreResult<()> {
        self.db.close()?;
        log_event(Event::StoreClose, &[("db", &self.connection)]);
        Ok(())
    }
}

fn encode(doc: &Map<String, Value>) -> StoreResult<String> {
    serde_json::to_string(doc).map_err(|e| StoreError::Encoding(e.into()))
}

fn log_open(connection: &str, report: &OpenReport) {
    log_event(Event::StoreOpen, &[("db", connection)]);
    if report.replayed_records > 0 {
        log_event(
            Event::LogReplayed,
            &[
                ("db", connection),
                ("records", &report.replayed_records.to_string()),
            ],
        );
    }
    if report.truncated_bytes > 0 {
        Logger::warn(
            Event::LogTruncated.as_str(),
            &[
                ("bytes", &report.truncated_bytes.to_string()),
                ("db", connection),
            ],
        );
    }
    if report.shrunk {
        log_event(Event::LogShrunk, &[("db", connection), ("trigger", "open")]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn store_at(clock: Arc<AtomicI64>) -> DocumentStore {
        DocumentStore::open(MEMORY)
            .unwrap()
            .with_clock(move || clock.load(Ordering::SeqCst))
    }

    #[test]
    fn test_create_stamps_envelope() {
        let clock = Arc::new(AtomicI64::new(1_000));
        let store = store_at(clock);

        let id = store.create("notes", r#"{"title":"hello"}"#).unwrap();
        let doc = store.read("notes", &id).unwrap();

        assert_eq!(doc["title"], "hello");
        assert_eq!(doc["_id"], id.as_str());
        assert_eq!(doc["created_at"], 1_000);
        assert_eq!(doc["updated_at"], 0);
        assert_eq!(doc["deleted_at"], 0);
    }

    #[test]
    fn test_create_overrides_reserved_fields() {
        let store = store_at(Arc::new(AtomicI64::new(7)));
        let id = store
            .create("notes", r#"{"_id":"mine","created_at":1,"deleted_at":9}"#)
            .unwrap();

        assert_ne!(id, "mine");
        let doc = store.read("notes", &id).unwrap();
        assert_eq!(doc["_id"], id.as_str());
        assert_eq!(doc["created_at"], 7);
        assert_eq!(doc["deleted_at"], 0);
        assert!(matches!(
            store.read("notes", "mine"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_create_rejects_non_objects() {
        let store = DocumentStore::open(MEMORY).unwrap();
        for payload in ["not json", "[1,2]", "\"text\"", "42", "null"] {
            let err = store.create("notes", payload).unwrap_err();
            assert!(matches!(err, StoreError::Encoding(_)), "{}", payload);
        }
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_invalid_collection_names() {
        let store = DocumentStore::open(MEMORY).unwrap();
        for name in ["", "a:b", "a*", "a?"] {
            let err = store.create(name, "{}").unwrap_err();
            assert!(matches!(err, StoreError::InvalidCollection(_)), "{:?}", name);
        }
    }

    #[test]
    fn test_update_replaces_body_and_preserves_envelope() {
        let clock = Arc::new(AtomicI64::new(100));
        let store = store_at(Arc::clone(&clock));

        let id = store.create("notes", r#"{"title":"a","draft":true}"#).unwrap();
        clock.store(200, Ordering::SeqCst);
        store.update("notes", &id, r#"{"title":"b"}"#).unwrap();

        let doc = store.read("notes", &id).unwrap();
        assert_eq!(doc["title"], "b");
        assert!(doc.get("draft").is_none());
        assert_eq!(doc["_id"], id.as_str());
        assert_eq!(doc["created_at"], 100);
        assert_eq!(doc["updated_at"], 200);
        assert_eq!(doc["deleted_at"], 0);
    }

    #[test]
    fn test_update_never_moves_updated_at_backwards() {
        let clock = Arc::new(AtomicI64::new(500));
        let store = store_at(Arc::clone(&clock));

        let id = store.create("notes", "{}").unwrap();
        store.update("notes", &id, "{}").unwrap();
        clock.store(400, Ordering::SeqCst);
        store.update("notes", &id, "{}").unwrap();

        assert_eq!(store.read("notes", &id).unwrap()["updated_at"], 500);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = DocumentStore::open(MEMORY).unwrap();
        let err = store.update("notes", "nope", "{}").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_update_bad_payload_leaves_document() {
        let store = DocumentStore::open(MEMORY).unwrap();
        let id = store.create("notes", r#"{"n":1}"#).unwrap();

        assert!(matches!(
            store.update("notes", &id, "[]"),
            Err(StoreError::Encoding(_))
        ));
        assert_eq!(store.read("notes", &id).unwrap()["n"], 1);
    }

    #[test]
    fn test_soft_delete_keeps_document() {
        let clock = Arc::new(AtomicI64::new(10));
        let store = store_at(Arc::clone(&clock));

        let id = store.create("notes", r#"{"n":1}"#).unwrap();
        clock.store(20, Ordering::SeqCst);
        store.update("notes", &id, r#"{"n":2}"#).unwrap();
        clock.store(30, Ordering::SeqCst);
        store.delete("notes", &id, false).unwrap();

        let doc = store.read("notes", &id).unwrap();
        assert_eq!(doc["n"], 2);
        assert_eq!(doc["created_at"], 10);
        assert_eq!(doc["updated_at"], 20);
        assert_eq!(doc["deleted_at"], 30);
    }

    #[test]
    fn test_second_soft_delete_keeps_first_stamp() {
        let clock = Arc::new(AtomicI64::new(10));
        let store = store_at(Arc::clone(&clock));

        let id = store.create("notes", "{}").unwrap();
        clock.store(20, Ordering::SeqCst);
        store.delete("notes", &id, false).unwrap();
        clock.store(30, Ordering::SeqCst);
        store.delete("notes", &id, false).unwrap();

        assert_eq!(store.read("notes", &id).unwrap()["deleted_at"], 20);
    }

    #[test]
    fn test_update_after_soft_delete_keeps_deleted_at() {
        let clock = Arc::new(AtomicI64::new(10));
        let store = store_at(Arc::clone(&clock));

        let id = store.create("notes", "{}").unwrap();
        clock.store(20, Ordering::SeqCst);
        store.delete("notes", &id, false).unwrap();
        clock.store(30, Ordering::SeqCst);
        store.update("notes", &id, r#"{"x":1}"#).unwrap();

        let doc = store.read("notes", &id).unwrap();
        assert_eq!(doc["deleted_at"], 20);
        assert_eq!(doc["updated_at"], 30);
    }

    #[test]
    fn test_permanent_delete_removes_everywhere() {
        let store = DocumentStore::open(MEMORY).unwrap();
        let id = store.create("notes", "{}").unwrap();

        store.delete("notes", &id, true).unwrap();

        assert!(store.read("notes", &id).unwrap_err().is_not_found());
        assert!(store.list(10, "").unwrap().documents.is_empty());
        assert!(store.collection_ids("notes").unwrap().is_empty());
        assert!(store.delete("notes", &id, true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = DocumentStore::open(MEMORY).unwrap();
        assert!(store.delete("notes", "x", false).unwrap_err().is_not_found());
        assert!(store.delete("notes", "x", true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_id_is_not_found() {
        let store = DocumentStore::open(MEMORY).unwrap();
        assert!(store.read("notes", "").unwrap_err().is_not_found());
        assert!(store.update("notes", "", "{}").unwrap_err().is_not_found());
        assert!(store.delete("notes", "", true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_collections_do_not_share_keys() {
        let store = DocumentStore::open(MEMORY).unwrap();
        let id = store.create("notes", "{}").unwrap();
        assert!(store.read("tasks", &id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_collection_ids_in_creation_order() {
        let store = DocumentStore::open(MEMORY).unwrap();
        let a = store.create("notes", "{}").unwrap();
        let other = store.create("tasks", "{}").unwrap();
        let b = store.create("notes", "{}").unwrap();

        assert_eq!(store.collection_ids("notes").unwrap(), vec![a, b]);
        assert_eq!(store.collection_ids("tasks").unwrap(), vec![other]);
        assert!(store.collection_ids("empty").unwrap().is_empty());
    }

    #[test]
    fn test_list_by_updated_timeline() {
        let clock = Arc::new(AtomicI64::new(1));
        let store = store_at(Arc::clone(&clock));

        let a = store.create("notes", "{}").unwrap();
        let b = store.create("notes", "{}").unwrap();
        clock.store(5, Ordering::SeqCst);
        store.update("notes", &a, "{}").unwrap();

        let page = store.list_by(Timeline::Updated, 10, "").unwrap();
        let ids: Vec<_> = page.documents.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!(b), json!(a)]);
    }

    #[test]
    fn test_close_is_idempotent_and_fails_later_ops() {
        let store = DocumentStore::open(MEMORY).unwrap();
        store.close().unwrap();
        store.close().unwrap();

        let err = store.create("notes", "{}").unwrap_err();
        assert_eq!(err.code(), "DOCSTORE_ENGINE_DATABASE_CLOSED");
        assert!(matches!(store.list(1, ""), Err(StoreError::Store(_))));
    }
}
