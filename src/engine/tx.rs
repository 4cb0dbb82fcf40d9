//! Read and write transactions
//!
//! A `ReadTx` borrows the shared state under the read lock. A `WriteTx`
//! borrows it mutably under the write lock and keeps an undo list plus the
//! log records the commit will append. Dropping a `WriteTx` without commit
//! leaves the undo work to `Db::update`, which always either commits or
//! rolls back before releasing the lock.

use super::db::{Item, State};
use super::errors::{EngineError, EngineResult};
use super::index::IndexKey;
use super::record::LogRecord;

/// Undo entry: key and the item it held before this transaction touched it
pub(crate) type Undo = (String, Option<Item>);

/// Read-only transaction
pub struct ReadTx<'a> {
    state: &'a State,
}

impl<'a> ReadTx<'a> {
    pub(crate) fn new(state: &'a State) -> Self {
        Self { state }
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> EngineResult<&str> {
        self.state.get(key)
    }

    /// Visits covered keys in ascending order of `index` until `f` returns false.
    pub fn ascend<F>(&self, index: &str, f: F) -> EngineResult<()>
    where
        F: FnMut(&str, &str) -> bool,
    {
        self.state.ascend(index, None, f)
    }

    /// Like `ascend`, starting at the first entry whose index value is `>= pivot`.
    pub fn ascend_from<F>(&self, index: &str, pivot: &IndexKey, f: F) -> EngineResult<()>
    where
        F: FnMut(&str, &str) -> bool,
    {
        self.state.ascend(index, Some(pivot), f)
    }

    /// Visits keys matching `pattern` in key order until `f` returns false.
    pub fn ascend_keys<F>(&self, pattern: &str, f: F)
    where
        F: FnMut(&str, &str) -> bool,
    {
        self.state.ascend_keys(pattern, f)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }

    /// Number of entries in `index`
    pub fn index_len(&self, index: &str) -> EngineResult<usize> {
        self.state.index_len(index)
    }
}

/// Read-write transaction
pub struct WriteTx<'a> {
    state: &'a mut State,
    undo: Vec<Undo>,
    records: Vec<LogRecord>,
}

impl<'a> WriteTx<'a> {
    pub(crate) fn new(state: &'a mut State) -> Self {
        Self {
            state,
            undo: Vec::new(),
            records: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<Undo>, Vec<LogRecord>) {
        (self.undo, self.records)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> EngineResult<&str> {
        self.state.get(key)
    }

    /// Stores `value` under `key`, returning the previous value if any.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        self.records.push(LogRecord::set(key, value.as_str()));
        let previous = self.state.raw_set(key, value);
        let previous_value = previous.as_ref().map(|item| item.value.clone());
        self.undo.push((key.to_string(), previous));
        previous_value
    }

    /// Removes `key`, returning its value. Fails with not-found if absent.
    pub fn delete(&mut self, key: &str) -> EngineResult<String> {
        let previous = self
            .state
            .raw_delete(key)
            .ok_or_else(|| EngineError::not_found(key))?;
        self.records.push(LogRecord::delete(key));
        let value = previous.value.clone();
        self.undo.push((key.to_string(), Some(previous)));
        Ok(value)
    }

    /// Visits covered keys in ascending order of `index` until `f` returns false.
    pub fn ascend<F>(&self, index: &str, f: F) -> EngineResult<()>
    where
        F: FnMut(&str, &str) -> bool,
    {
        self.state.ascend(index, None, f)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }
}
