//! The embedded database handle
//!
//! One `RwLock` guards the whole key space: update transactions hold the
//! write guard (single writer), view transactions share the read guard.
//! Commit order is: closure succeeds, log append succeeds, lock released.
//! Any failure before the lock is released restores the previous state.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::errors::{EngineError, EngineResult};
use super::index::{Index, IndexKey, IndexKind};
use super::log::{AppendLog, SyncPolicy};
use super::pattern;
use super::record::{LogOp, LogRecord};
use super::tx::{ReadTx, Undo, WriteTx};

/// Connection string selecting a non-persistent database
pub const MEMORY: &str = ":memory:";

/// Tuning knobs for `Db::open_with`
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub sync_policy: SyncPolicy,
    /// Shrink on open when stale records exceed this percentage of live keys.
    /// `None` disables automatic shrinking.
    pub auto_shrink_percentage: Option<u32>,
    /// Logs smaller than this are never shrunk automatically
    pub auto_shrink_min_size: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sync_policy: SyncPolicy::Always,
            auto_shrink_percentage: Some(100),
            auto_shrink_min_size: 32 * 1024 * 1024,
        }
    }
}

/// What happened while opening
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenReport {
    pub replayed_records: usize,
    pub truncated_bytes: u64,
    pub shrunk: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Item {
    pub(crate) value: String,
    pub(crate) seq: u64,
}

pub(crate) struct State {
    items: BTreeMap<String, Item>,
    indexes: BTreeMap<String, Index>,
    next_seq: u64,
    log: Option<AppendLog>,
    closed: bool,
}

impl State {
    fn new(log: Option<AppendLog>) -> Self {
        Self {
            items: BTreeMap::new(),
            indexes: BTreeMap::new(),
            next_seq: 0,
            log,
            closed: false,
        }
    }

    pub(crate) fn get(&self, key: &str) -> EngineResult<&str> {
        self.items
            .get(key)
            .map(|item| item.value.as_str())
            .ok_or_else(|| EngineError::not_found(key))
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn index_len(&self, name: &str) -> EngineResult<usize> {
        self.indexes
            .get(name)
            .map(Index::len)
            .ok_or_else(|| EngineError::index_not_found(name))
    }

    pub(crate) fn ascend<F>(&self, name: &str, pivot: Option<&IndexKey>, mut f: F) -> EngineResult<()>
    where
        F: FnMut(&str, &str) -> bool,
    {
        let index = self
            .indexes
            .get(name)
            .ok_or_else(|| EngineError::index_not_found(name))?;

        let keys: Box<dyn Iterator<Item = &str> + '_> = match pivot {
            Some(p) => Box::new(index.iter_from(p)),
            None => Box::new(index.iter()),
        };

        for key in keys {
            if let Some(item) = self.items.get(key) {
                if !f(key, &item.value) {
                    break;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn ascend_keys<F>(&self, pattern: &str, mut f: F)
    where
        F: FnMut(&str, &str) -> bool,
    {
        for (key, item) in &self.items {
            if pattern::matches(pattern, key) && !f(key, &item.value) {
                break;
            }
        }
    }

    fn index_insert(&mut self, key: &str, item: &Item) {
        let mut parsed: Option<Option<Value>> = None;
        for index in self.indexes.values_mut() {
            if !index.covers(key) {
                continue;
            }
            let json = if index.kind().needs_json() {
                parsed
                    .get_or_insert_with(|| serde_json::from_str(&item.value).ok())
                    .as_ref()
            } else {
                None
            };
            let index_key = index.kind().key_for(&item.value, json);
            index.insert(index_key, item.seq, key);
        }
    }

    fn index_remove(&mut self, key: &str, item: &Item) {
        let mut parsed: Option<Option<Value>> = None;
        for index in self.indexes.values_mut() {
            if !index.covers(key) {
                continue;
            }
            let json = if index.kind().needs_json() {
                parsed
                    .get_or_insert_with(|| serde_json::from_str(&item.value).ok())
                    .as_ref()
            } else {
                None
            };
            let index_key = index.kind().key_for(&item.value, json);
            index.remove(index_key, item.seq, key);
        }
    }

    /// Sets a key, keeping its insertion sequence if it already exists.
    pub(crate) fn raw_set(&mut self, key: &str, value: String) -> Option<Item> {
        let previous = self.items.remove(key);
        let seq = match &previous {
            Some(prev) => {
                self.index_remove(key, prev);
                prev.seq
            }
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };

        let item = Item { value, seq };
        self.index_insert(key, &item);
        self.items.insert(key.to_string(), item);
        previous
    }

    pub(crate) fn raw_delete(&mut self, key: &str) -> Option<Item> {
        let previous = self.items.remove(key)?;
        self.index_remove(key, &previous);
        Some(previous)
    }

    /// Puts `key` back to exactly `previous`, sequence included.
    fn restore(&mut self, key: &str, previous: Option<Item>) {
        self.raw_delete(key);
        if let Some(item) = previous {
            self.index_insert(key, &item);
            self.items.insert(key.to_string(), item);
        }
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for (key, previous) in undo.into_iter().rev() {
            self.restore(&key, previous);
        }
    }

    fn apply(&mut self, record: LogRecord) {
        match record.op {
            LogOp::Set => {
                self.raw_set(&record.key, record.value);
            }
            LogOp::Delete => {
                self.raw_delete(&record.key);
            }
        }
    }

    /// Live keys as set records, in insertion-sequence order
    fn snapshot_records(&self) -> Vec<LogRecord> {
        let mut live: Vec<(&String, &Item)> = self.items.iter().collect();
        live.sort_by_key(|(_, item)| item.seq);
        live.into_iter()
            .map(|(key, item)| LogRecord::set(key.as_str(), item.value.as_str()))
            .collect()
    }

    fn shrink(&mut self) -> EngineResult<()> {
        let records = self.snapshot_records();
        match self.log.as_mut() {
            Some(log) => log.rewrite(records),
            None => Ok(()),
        }
    }
}

/// An embedded, ordered, transactional key-value database
pub struct Db {
    state: RwLock<State>,
    report: OpenReport,
}

impl Db {
    /// Opens `connection` with default options.
    ///
    /// `":memory:"` opens a database that is never persisted; anything else
    /// is a log file path.
    pub fn open(connection: &str) -> EngineResult<Self> {
        Self::open_with(connection, EngineOptions::default())
    }

    /// Opens `connection` with explicit options.
    pub fn open_with(connection: &str, options: EngineOptions) -> EngineResult<Self> {
        if connection == MEMORY {
            return Ok(Self {
                state: RwLock::new(State::new(None)),
                report: OpenReport::default(),
            });
        }

        let (log, replay) = AppendLog::open(Path::new(connection), options.sync_policy)?;
        let mut report = OpenReport {
            replayed_records: replay.records.len(),
            truncated_bytes: replay.truncated_bytes,
            shrunk: false,
        };

        let mut state = State::new(Some(log));
        for record in replay.records {
            state.apply(record);
        }

        if let Some(percentage) = options.auto_shrink_percentage {
            let live = state.len();
            let stale = report.replayed_records.saturating_sub(live);
            let log_size = state.log.as_ref().map(AppendLog::size).unwrap_or(0);
            if log_size >= options.auto_shrink_min_size
                && (stale as u64) * 100 > (percentage as u64) * (live.max(1) as u64)
            {
                state.shrink()?;
                report.shrunk = true;
            }
        }

        Ok(Self {
            state: RwLock::new(state),
            report,
        })
    }

    /// What replay did when this handle was opened
    pub fn open_report(&self) -> &OpenReport {
        &self.report
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, State>> {
        let guard = self.state.read().map_err(|_| EngineError::lock_poisoned())?;
        if guard.closed {
            return Err(EngineError::database_closed());
        }
        Ok(guard)
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, State>> {
        let guard = self.state.write().map_err(|_| EngineError::lock_poisoned())?;
        if guard.closed {
            return Err(EngineError::database_closed());
        }
        Ok(guard)
    }

    /// Runs `f` in a read-only transaction.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadTx<'_>) -> Result<T, E>,
        E: From<EngineError>,
    {
        let guard = self.read()?;
        let tx = ReadTx::new(&guard);
        f(&tx)
    }

    /// Runs `f` in a read-write transaction.
    ///
    /// If `f` fails, or the log append fails, every change made by `f` is
    /// rolled back and the error is returned.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTx<'_>) -> Result<T, E>,
        E: From<EngineError>,
    {
        let mut guard = self.write()?;
        let state: &mut State = &mut guard;

        let mut tx = WriteTx::new(state);
        let outcome = f(&mut tx);
        let (undo, records) = tx.into_parts();

        match outcome {
            Ok(value) => {
                if let Some(log) = state.log.as_mut() {
                    if let Err(e) = log.append(&records) {
                        state.rollback(undo);
                        return Err(e.into());
                    }
                }
                Ok(value)
            }
            Err(e) => {
                state.rollback(undo);
                Err(e)
            }
        }
    }

    /// Creates an index over every key matching `pattern`.
    ///
    /// Existing keys are indexed immediately. Index definitions are not
    /// persisted; callers recreate them after opening.
    pub fn create_index(&self, name: &str, pattern: &str, kind: IndexKind) -> EngineResult<()> {
        let mut guard = self.write()?;
        let state: &mut State = &mut guard;

        if state.indexes.contains_key(name) {
            return Err(EngineError::index_exists(name));
        }

        let mut index = Index::new(name, pattern, kind);
        for (key, item) in &state.items {
            if !index.covers(key) {
                continue;
            }
            let parsed = if index.kind().needs_json() {
                serde_json::from_str::<Value>(&item.value).ok()
            } else {
                None
            };
            let index_key = index.kind().key_for(&item.value, parsed.as_ref());
            index.insert(index_key, item.seq, key);
        }

        state.indexes.insert(name.to_string(), index);
        Ok(())
    }

    /// Removes an index.
    pub fn drop_index(&self, name: &str) -> EngineResult<()> {
        let mut guard = self.write()?;
        guard
            .indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::index_not_found(name))
    }

    /// Names of all indexes, sorted
    pub fn indexes(&self) -> EngineResult<Vec<String>> {
        let guard = self.read()?;
        Ok(guard.indexes.keys().cloned().collect())
    }

    /// Rewrites the log so it holds only the live keys.
    ///
    /// No-op for in-memory databases.
    pub fn shrink(&self) -> EngineResult<()> {
        let mut guard = self.write()?;
        guard.shrink()
    }

    /// Size of the log in bytes (0 for in-memory databases)
    pub fn log_size(&self) -> EngineResult<u64> {
        let guard = self.read()?;
        Ok(guard.log.as_ref().map(AppendLog::size).unwrap_or(0))
    }

    /// Syncs and releases the log. Calling it again is a no-op.
    ///
    /// Every other operation fails with database-closed afterwards.
    pub fn close(&self) -> EngineResult<()> {
        let mut guard = self.state.write().map_err(|_| EngineError::lock_poisoned())?;
        if guard.closed {
            return Ok(());
        }
        if let Some(log) = guard.log.as_mut() {
            log.sync()?;
        }
        guard.log = None;
        guard.items.clear();
        guard.indexes.clear();
        guard.closed = true;
        Ok(())
    }
}
