//! Engine error types
//!
//! Error codes:
//! - DOCSTORE_ENGINE_IO_ERROR (ERROR severity)
//! - DOCSTORE_ENGINE_WRITE_FAILED (ERROR severity)
//! - DOCSTORE_ENGINE_LOG_CORRUPTION (FATAL severity)
//! - DOCSTORE_ENGINE_NOT_FOUND (ERROR severity)
//! - DOCSTORE_ENGINE_INDEX_EXISTS (ERROR severity)
//! - DOCSTORE_ENGINE_INDEX_NOT_FOUND (ERROR severity)
//! - DOCSTORE_ENGINE_DATABASE_CLOSED (ERROR severity)
//! - DOCSTORE_ENGINE_LOCK_POISONED (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, process continues
    Error,
    /// The database handle can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Engine-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCode {
    /// Disk I/O failure while opening or reading the log
    IoError,
    /// Appending to the log failed
    WriteFailed,
    /// A log record failed checksum or framing validation
    LogCorruption,
    /// Key does not exist
    NotFound,
    /// An index with this name already exists
    IndexExists,
    /// No index with this name exists
    IndexNotFound,
    /// The database has been closed
    DatabaseClosed,
    /// A thread panicked while holding the database lock
    LockPoisoned,
}

impl EngineErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            EngineErrorCode::IoError => "DOCSTORE_ENGINE_IO_ERROR",
            EngineErrorCode::WriteFailed => "DOCSTORE_ENGINE_WRITE_FAILED",
            EngineErrorCode::LogCorruption => "DOCSTORE_ENGINE_LOG_CORRUPTION",
            EngineErrorCode::NotFound => "DOCSTORE_ENGINE_NOT_FOUND",
            EngineErrorCode::IndexExists => "DOCSTORE_ENGINE_INDEX_EXISTS",
            EngineErrorCode::IndexNotFound => "DOCSTORE_ENGINE_INDEX_NOT_FOUND",
            EngineErrorCode::DatabaseClosed => "DOCSTORE_ENGINE_DATABASE_CLOSED",
            EngineErrorCode::LockPoisoned => "DOCSTORE_ENGINE_LOCK_POISONED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            EngineErrorCode::LogCorruption | EngineErrorCode::LockPoisoned => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Engine error with code, message and optional context
#[derive(Debug)]
pub struct EngineError {
    code: EngineErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl EngineError {
    fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// I/O failure while opening, reading or syncing the log
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(EngineErrorCode::IoError, message)
        }
    }

    /// Log append failed
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(EngineErrorCode::WriteFailed, message)
        }
    }

    /// Log corruption detected at a byte offset
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::new(EngineErrorCode::LogCorruption, reason)
        }
    }

    /// Key lookup failed
    pub fn not_found(key: &str) -> Self {
        Self {
            details: Some(format!("key: {}", key)),
            ..Self::new(EngineErrorCode::NotFound, "key not found")
        }
    }

    /// Index name already taken
    pub fn index_exists(name: &str) -> Self {
        Self::new(
            EngineErrorCode::IndexExists,
            format!("index already exists: {}", name),
        )
    }

    /// Index name unknown
    pub fn index_not_found(name: &str) -> Self {
        Self::new(
            EngineErrorCode::IndexNotFound,
            format!("index not found: {}", name),
        )
    }

    /// Operation on a closed database
    pub fn database_closed() -> Self {
        Self::new(EngineErrorCode::DatabaseClosed, "database closed")
    }

    /// Poisoned lock
    pub fn lock_poisoned() -> Self {
        Self::new(
            EngineErrorCode::LockPoisoned,
            "database lock poisoned by a panicked transaction",
        )
    }

    /// Returns the error code
    pub fn code(&self) -> EngineErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the database handle should be abandoned
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns whether this is a missing-key error
    pub fn is_not_found(&self) -> bool {
        self.code == EngineErrorCode::NotFound
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_prefixed() {
        let codes = [
            EngineErrorCode::IoError,
            EngineErrorCode::WriteFailed,
            EngineErrorCode::LogCorruption,
            EngineErrorCode::NotFound,
            EngineErrorCode::IndexExists,
            EngineErrorCode::IndexNotFound,
            EngineErrorCode::DatabaseClosed,
            EngineErrorCode::LockPoisoned,
        ];
        for code in codes {
            assert!(code.code().starts_with("DOCSTORE_ENGINE_"));
        }
    }

    #[test]
    fn test_corruption_is_fatal() {
        let err = EngineError::corruption_at_offset(12, "checksum mismatch");
        assert!(err.is_fatal());
        assert_eq!(err.details(), Some("byte_offset: 12"));
    }

    #[test]
    fn test_not_found_not_fatal() {
        let err = EngineError::not_found("notes:abc");
        assert!(!err.is_fatal());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_display_contains_code_and_details() {
        let err = EngineError::not_found("notes:abc");
        let display = err.to_string();
        assert!(display.contains("ERROR"));
        assert!(display.contains("DOCSTORE_ENGINE_NOT_FOUND"));
        assert!(display.contains("notes:abc"));
    }

    #[test]
    fn test_write_failed_keeps_source() {
        use std::error::Error;
        let err = EngineError::write_failed(
            "append failed",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        assert!(err.source().is_some());
        assert!(!err.is_fatal());
    }
}
