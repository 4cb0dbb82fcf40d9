//! Append-only durability log
//!
//! Every committed transaction is appended as a batch of records in a single
//! `write_all`. On open the whole file is replayed; a torn tail (crash mid
//! append) is truncated away, any other framing or checksum failure is fatal.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};
use super::record::LogRecord;

/// When appended records are fsynced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// fsync after every committed transaction
    #[default]
    Always,
    /// Leave flushing to the OS; sync only on close and shrink
    Never,
}

/// Result of replaying a log file
#[derive(Debug, Default)]
pub struct Replay {
    /// Records in file order
    pub records: Vec<LogRecord>,
    /// Bytes of valid records
    pub valid_len: u64,
    /// Bytes dropped from a torn tail
    pub truncated_bytes: u64,
}

/// Reads and validates every record in the file.
///
/// A missing file replays as empty.
pub fn replay(path: &Path) -> EngineResult<Replay> {
    let data = match fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
        Err(e) => {
            return Err(EngineError::io_error(
                format!("Failed to read log: {}", path.display()),
                e,
            ))
        }
    };

    let mut replay = Replay::default();
    let mut offset = 0usize;

    while offset < data.len() {
        match LogRecord::deserialize(&data[offset..]) {
            Ok((record, consumed)) => {
                replay.records.push(record);
                offset += consumed;
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                replay.truncated_bytes = (data.len() - offset) as u64;
                break;
            }
            Err(e) => {
                return Err(EngineError::corruption_at_offset(
                    offset as u64,
                    e.to_string(),
                ))
            }
        }
    }

    replay.valid_len = offset as u64;
    Ok(replay)
}

/// Writer side of the log
pub struct AppendLog {
    path: PathBuf,
    file: File,
    size: u64,
    sync: SyncPolicy,
}

impl AppendLog {
    /// Opens (creating if needed) the log and replays it.
    ///
    /// A torn tail is cut off so later appends start on a record boundary.
    pub fn open(path: &Path, sync: SyncPolicy) -> EngineResult<(Self, Replay)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    EngineError::io_error(
                        format!("Failed to create log directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let replay = replay(path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                EngineError::io_error(format!("Failed to open log: {}", path.display()), e)
            })?;

        if replay.truncated_bytes > 0 {
            file.set_len(replay.valid_len).map_err(|e| {
                EngineError::io_error("Failed to truncate torn log tail", e)
            })?;
        }

        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                size: replay.valid_len,
                sync,
            },
            replay,
        ))
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Appends one transaction's records.
    ///
    /// On failure the file is cut back to its previous length so a partial
    /// batch never survives.
    pub fn append(&mut self, records: &[LogRecord]) -> EngineResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for record in records {
            buf.extend(record.serialize());
        }

        if let Err(e) = self.file.write_all(&buf) {
            let _ = self.file.set_len(self.size);
            return Err(EngineError::write_failed("Failed to append to log", e));
        }

        if self.sync == SyncPolicy::Always {
            if let Err(e) = self.file.sync_data() {
                let _ = self.file.set_len(self.size);
                return Err(EngineError::write_failed("fsync failed after append", e));
            }
        }

        self.size += buf.len() as u64;
        Ok(())
    }

    /// Flushes and fsyncs regardless of policy.
    pub fn sync(&mut self) -> EngineResult<()> {
        self.file
            .flush()
            .and_then(|_| self.file.sync_all())
            .map_err(|e| EngineError::io_error("Failed to sync log", e))
    }

    /// Replaces the log contents with `records`.
    ///
    /// Writes a sibling temp file, syncs it, renames it over the log and
    /// reopens for append.
    pub fn rewrite<I>(&mut self, records: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        let tmp_path = self.path.with_extension("shrink");

        let mut size = 0u64;
        {
            let mut tmp = File::create(&tmp_path).map_err(|e| {
                EngineError::io_error(format!("Failed to create {}", tmp_path.display()), e)
            })?;
            for record in records {
                let bytes = record.serialize();
                tmp.write_all(&bytes)
                    .map_err(|e| EngineError::write_failed("Failed to write shrunk log", e))?;
                size += bytes.len() as u64;
            }
            tmp.sync_all()
                .map_err(|e| EngineError::write_failed("Failed to sync shrunk log", e))?;
        }

        fs::rename(&tmp_path, &self.path)
            .map_err(|e| EngineError::io_error("Failed to replace log with shrunk copy", e))?;

        self.file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| EngineError::io_error("Failed to reopen log after shrink", e))?;
        self.size = size;
        Ok(())
    }
}
