//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit status.

use std::fmt;
use std::io;

use crate::store::StoreError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, unreadable or invalid
    ConfigError,
    /// I/O error
    IoError,
    /// Store could not be opened or the server could not start
    BootFailed,
    /// Offline maintenance failed
    MaintenanceFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DOCSTORE_CLI_CONFIG_ERROR",
            Self::IoError => "DOCSTORE_CLI_IO_ERROR",
            Self::BootFailed => "DOCSTORE_CLI_BOOT_FAILED",
            Self::MaintenanceFailed => "DOCSTORE_CLI_MAINTENANCE_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn maintenance_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::MaintenanceFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::boot_failed(format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_code_then_message() {
        let err = CliError::config_error("bad port");
        assert_eq!(err.to_string(), "DOCSTORE_CLI_CONFIG_ERROR: bad port");
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_store_errors_are_boot_failures() {
        let err = CliError::from(StoreError::InvalidCollection("a:b".into()));
        assert_eq!(err.code_str(), "DOCSTORE_CLI_BOOT_FAILED");
        assert!(err.message().contains("DOCSTORE_INVALID_COLLECTION"));
    }
}
