//! Recovery error types
//!
//! Error codes:
//! - FSEQ_RECOVERY_WAL_CORRUPTION (FATAL)
//! - FSEQ_RECOVERY_REPLAY_FAILED (FATAL)
//! - FSEQ_RECOVERY_INCONSISTENT (FATAL)
//!
//! Every recovery error halts startup: a data directory that cannot be
//! replayed and verified is never served.

use std::fmt;

use crate::wal::Severity;

/// Recovery-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryErrorCode {
    /// A WAL record failed validation during replay
    WalCorruption,
    /// A valid WAL record could not be applied, or recovery I/O failed
    ReplayFailed,
    /// Replayed tables violate an ordering or referential invariant
    Inconsistent,
}

impl RecoveryErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            RecoveryErrorCode::WalCorruption => "FSEQ_RECOVERY_WAL_CORRUPTION",
            RecoveryErrorCode::ReplayFailed => "FSEQ_RECOVERY_REPLAY_FAILED",
            RecoveryErrorCode::Inconsistent => "FSEQ_RECOVERY_INCONSISTENT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for RecoveryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Recovery error with location context
#[derive(Debug)]
pub struct RecoveryError {
    code: RecoveryErrorCode,
    message: String,
    /// Byte offset in the WAL, if applicable
    offset: Option<u64>,
    /// WAL sequence number, if applicable
    sequence: Option<u64>,
}

impl RecoveryError {
    /// Create a WAL corruption error
    pub fn wal_corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::WalCorruption,
            message: format!("WAL corruption at offset {}: {}", offset, reason.into()),
            offset: Some(offset),
            sequence: None,
        }
    }

    /// Create a replay failure for the record at `sequence`
    pub fn replay_failed(sequence: u64, reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::ReplayFailed,
            message: format!(
                "Failed to apply WAL record {}: {}",
                sequence,
                reason.into()
            ),
            offset: None,
            sequence: Some(sequence),
        }
    }

    /// Create a general recovery failure
    pub fn recovery_failed(reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::ReplayFailed,
            message: reason.into(),
            offset: None,
            sequence: None,
        }
    }

    /// Create an inconsistency error found by verification
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::Inconsistent,
            message: reason.into(),
            offset: None,
            sequence: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> RecoveryErrorCode {
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

    /// Returns the WAL offset if applicable
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Returns the WAL sequence number if applicable
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// All recovery errors are fatal
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for RecoveryError {}

/// Result type for recovery operations
pub type RecoveryResult<T> = Result<T, RecoveryError>;
