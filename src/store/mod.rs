//! Schemaless document store
//!
//! Collections of JSON documents on top of the embedded engine. Documents
//! are keyed `<collection>:<id>`, stamped with lifecycle timestamps, and
//! listed across all collections through offset-paged timestamp indexes.
//!
//! ```ignore
//! use docstore::store::DocumentStore;
//!
//! let store = DocumentStore::open(":memory:")?;
//! let id = store.create("notes", r#"{"title":"hello"}"#)?;
//! let doc = store.read("notes", &id)?;
//! store.delete("notes", &id, false)?;
//! let page = store.list(20, "")?;
//! ```

mod cursor;
mod document_store;
mod errors;
mod registry;

pub use cursor::{parse_token, Page, Timeline};
pub use document_store::{
    document_key, validate_collection, Clock, DocumentStore, StoreConfig,
};
pub use errors::{StoreError, StoreResult};
pub use registry::{collection_pattern, id_index_name, CollectionRegistry};
