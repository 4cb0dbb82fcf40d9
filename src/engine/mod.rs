//! Embedded ordered key-value engine
//!
//! A sorted key space with ACID single-writer transactions, glob-scoped
//! secondary indexes and an append-only, checksummed durability log.
//!
//! # Design Principles
//!
//! - One writer at a time, many concurrent readers
//! - A transaction either fully commits (memory and log) or leaves no trace
//! - Indexes are derived state: built from the key space, never persisted
//! - Ties inside an index follow key insertion order
//!
//! # Usage
//!
//! ```ignore
//! use docstore::engine::{Db, EngineError, IndexKind};
//!
//! let db = Db::open(":memory:")?;
//! db.create_index("created_at", "*", IndexKind::json("created_at"))?;
//! db.update(|tx| {
//!     tx.set("notes:1", r#"{"created_at": 10}"#);
//!     Ok::<_, EngineError>(())
//! })?;
//! ```

mod checksum;
mod db;
mod errors;
mod index;
mod log;
mod pattern;
mod record;
mod tx;

pub use checksum::compute_checksum;
pub use db::{Db, EngineOptions, OpenReport, MEMORY};
pub use errors::{EngineError, EngineErrorCode, EngineResult, Severity};
pub use index::{IndexKey, IndexKind};
pub use log::SyncPolicy;
pub use pattern::{has_wildcards, matches};
pub use record::{LogOp, LogRecord};
pub use tx::{ReadTx, WriteTx};
