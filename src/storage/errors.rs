//! Storage error types
//!
//! Error codes:
//! - FSEQ_STORAGE_IO_ERROR (ERROR severity)
//! - FSEQ_STORAGE_WRITE_FAILED (ERROR severity)
//! - FSEQ_STORAGE_CONSTRAINT_VIOLATION (ERROR severity)
//! - FSEQ_DATA_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

use crate::recovery::RecoveryError;
use crate::wal::{Severity, WalError, WalErrorCode};

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure outside the WAL append path
    IoError,
    /// Commit could not be made durable
    WriteFailed,
    /// A table constraint rejected a row
    ConstraintViolation,
    /// Persisted state failed validation
    DataCorruption,
}

impl StorageErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::IoError => "FSEQ_STORAGE_IO_ERROR",
            StorageErrorCode::WriteFailed => "FSEQ_STORAGE_WRITE_FAILED",
            StorageErrorCode::ConstraintViolation => "FSEQ_STORAGE_CONSTRAINT_VIOLATION",
            StorageErrorCode::DataCorruption => "FSEQ_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::DataCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Which table constraint rejected a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Duplicate primary key (flight code or order record key)
    UniqueKey,
    /// Duplicate order position
    UniquePosition,
    /// Order entry references a flight that does not exist
    ForeignKey,
    /// Flight is still referenced by an order entry
    Restrict,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::UniqueKey => "unique_key",
            Constraint::UniquePosition => "unique_position",
            Constraint::ForeignKey => "foreign_key",
            Constraint::Restrict => "restrict",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
enum Source {
    Io(io::Error),
    Wal(WalError),
    Recovery(RecoveryError),
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    constraint: Option<Constraint>,
    source: Option<Source>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            constraint: None,
            source: None,
        }
    }

    /// Create a storage I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        let mut err = Self::new(StorageErrorCode::IoError, message);
        err.source = Some(Source::Io(source));
        err
    }

    /// Create a write failed error without an underlying cause
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::WriteFailed, message)
    }

    /// Create a write failed error caused by the WAL
    pub fn wal_failed(message: impl Into<String>, source: WalError) -> Self {
        let code = match source.code() {
            WalErrorCode::Corruption | WalErrorCode::Poisoned => StorageErrorCode::DataCorruption,
            _ => StorageErrorCode::WriteFailed,
        };
        let mut err = Self::new(code, message);
        err.details = Some(source.to_string());
        err.source = Some(Source::Wal(source));
        err
    }

    /// Create a constraint violation error
    pub fn constraint_violation(constraint: Constraint, message: impl Into<String>) -> Self {
        let mut err = Self::new(StorageErrorCode::ConstraintViolation, message);
        err.details = Some(format!("constraint: {}", constraint));
        err.constraint = Some(constraint);
        err
    }

    /// Create a data corruption error for a data directory that failed
    /// recovery (FATAL)
    pub fn recovery_failed(source: RecoveryError) -> Self {
        let mut err = Self::new(
            StorageErrorCode::DataCorruption,
            "Data directory failed recovery",
        );
        err.details = Some(source.to_string());
        err.source = Some(Source::Recovery(source));
        err
    }

    /// Create a data corruption error (FATAL)
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::DataCorruption, message)
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the violated constraint, for constraint violations
    pub fn constraint(&self) -> Option<Constraint> {
        self.constraint
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

    /// Returns whether the data directory must be considered unusable
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
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

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.source {
            Some(Source::Io(ref e)) => Some(e),
            Some(Source::Wal(ref e)) => Some(e),
            Some(Source::Recovery(ref e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
