//! Log record format
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record including this field)
//! +------------------+
//! | Op               | (u8: 1 = set, 2 = delete)
//! +------------------+
//! | Key              | (length-prefixed UTF-8)
//! +------------------+
//! | Value            | (length-prefixed UTF-8, empty for delete)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! The checksum covers every byte before it.

use std::io::{self, Read};

use super::checksum::compute_checksum;

/// Smallest possible record: length + op + two empty strings + checksum
pub const MIN_RECORD_SIZE: usize = 4 + 1 + 4 + 4 + 4;

/// Mutation kind carried by a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOp {
    /// Key set to a value
    Set,
    /// Key removed
    Delete,
}

impl LogOp {
    fn as_byte(self) -> u8 {
        match self {
            LogOp::Set => 1,
            LogOp::Delete => 2,
        }
    }

    fn from_byte(b: u8) -> io::Result<Self> {
        match b {
            1 => Ok(LogOp::Set),
            2 => Ok(LogOp::Delete),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown log op: {}", other),
            )),
        }
    }
}

/// One committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub op: LogOp,
    pub key: String,
    pub value: String,
}

impl LogRecord {
    /// Record for a set
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: LogOp::Set,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Record for a delete
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            op: LogOp::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Serialize the complete record to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let record_length = MIN_RECORD_SIZE + self.key.len() + self.value.len();

        let mut buf = Vec::with_capacity(record_length);
        buf.extend_from_slice(&(record_length as u32).to_le_bytes());
        buf.push(self.op.as_byte());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.value.as_bytes());

        let checksum = compute_checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Deserialize a record from bytes, verifying the checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    /// `UnexpectedEof` means the buffer ends mid-record (torn write);
    /// `InvalidData` means the bytes are present but wrong.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < 4 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = io::Cursor::new(&data[4..checksum_offset]);

        fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
            let mut len_buf = [0u8; 4];
            reader.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut buf = vec![0u8; len];
            reader.read_exact(&mut buf)?;

            String::from_utf8(buf).map_err(|e| {
                io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
            })
        }

        // The checksum matched, so a short body is malformed, not torn.
        let body = (|| -> io::Result<Self> {
            let mut op_buf = [0u8; 1];
            cursor.read_exact(&mut op_buf)?;
            let op = LogOp::from_byte(op_buf[0])?;
            let key = read_string(&mut cursor)?;
            let value = read_string(&mut cursor)?;
            Ok(Self { op, key, value })
        })()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        Ok((body, record_length))
    }
}
