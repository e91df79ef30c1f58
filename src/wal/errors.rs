//! WAL error types
//!
//! | Code                     | Severity | Raised when                                   |
//! |--------------------------|----------|-----------------------------------------------|
//! | `FSEQ_WAL_ENCODE_FAILED` | ERROR    | a transaction cannot be framed as a record    |
//! | `FSEQ_WAL_WRITE_FAILED`  | ERROR    | the record could not be written; file cut back |
//! | `FSEQ_WAL_FSYNC_FAILED`  | FATAL    | fsync after a written record failed           |
//! | `FSEQ_WAL_POISONED`      | FATAL    | a failed append could not be cut back         |
//! | `FSEQ_WAL_CORRUPTION`    | FATAL    | a record fails validation on read             |
//!
//! A poisoned writer refuses every later append: the file may end in a torn
//! record, and anything written after it would be lost on the next replay.

use std::fmt;
use std::io;

/// Severity levels shared by the infrastructure error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, process continues
    Error,
    /// Data directory can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        })
    }
}

/// WAL-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalErrorCode {
    EncodeFailed,
    WriteFailed,
    FsyncFailed,
    Poisoned,
    Corruption,
}

impl WalErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            WalErrorCode::EncodeFailed => "FSEQ_WAL_ENCODE_FAILED",
            WalErrorCode::WriteFailed => "FSEQ_WAL_WRITE_FAILED",
            WalErrorCode::FsyncFailed => "FSEQ_WAL_FSYNC_FAILED",
            WalErrorCode::Poisoned => "FSEQ_WAL_POISONED",
            WalErrorCode::Corruption => "FSEQ_WAL_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            WalErrorCode::EncodeFailed | WalErrorCode::WriteFailed => Severity::Error,
            WalErrorCode::FsyncFailed | WalErrorCode::Poisoned | WalErrorCode::Corruption => {
                Severity::Fatal
            }
        }
    }
}

impl fmt::Display for WalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Where in the log an error was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalPosition {
    /// Byte offset into `wal.log`
    Offset(u64),
    /// Sequence number of the record being written or read
    Sequence(u64),
}

impl fmt::Display for WalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalPosition::Offset(offset) => write!(f, "byte_offset: {}", offset),
            WalPosition::Sequence(sequence) => write!(f, "sequence_number: {}", sequence),
        }
    }
}

#[derive(Debug)]
enum Cause {
    Io(io::Error),
    Encode(serde_json::Error),
}

/// WAL error with code, message, log position and underlying cause
#[derive(Debug)]
pub struct WalError {
    code: WalErrorCode,
    message: String,
    position: Option<WalPosition>,
    cause: Option<Cause>,
}

impl WalError {
    fn new(code: WalErrorCode, message: impl Into<String>, position: Option<WalPosition>) -> Self {
        Self {
            code,
            message: message.into(),
            position,
            cause: None,
        }
    }

    fn with_io(mut self, e: io::Error) -> Self {
        self.cause = Some(Cause::Io(e));
        self
    }

    /// The mutations of `sequence` could not be encoded as a payload
    pub fn encode_failed(sequence: u64, e: serde_json::Error) -> Self {
        let mut err = Self::new(
            WalErrorCode::EncodeFailed,
            "Failed to encode mutations",
            Some(WalPosition::Sequence(sequence)),
        );
        err.cause = Some(Cause::Encode(e));
        err
    }

    /// The encoded record of `sequence` does not fit the u32 frame
    pub fn frame_too_large(sequence: u64, len: usize) -> Self {
        Self::new(
            WalErrorCode::EncodeFailed,
            format!("Record of {} bytes exceeds the u32 frame", len),
            Some(WalPosition::Sequence(sequence)),
        )
    }

    /// Opening or writing the log failed; nothing was left behind
    pub fn write_failed(message: impl Into<String>, e: io::Error) -> Self {
        Self::new(WalErrorCode::WriteFailed, message, None).with_io(e)
    }

    /// The record of `sequence` was written but fsync failed
    pub fn fsync_failed(sequence: u64, e: io::Error) -> Self {
        Self::new(
            WalErrorCode::FsyncFailed,
            "fsync failed after WAL append",
            Some(WalPosition::Sequence(sequence)),
        )
        .with_io(e)
    }

    /// Cutting the file back to `offset` after a failed append failed
    pub fn cut_back_failed(offset: u64, e: io::Error) -> Self {
        Self::new(
            WalErrorCode::Poisoned,
            "Failed to cut WAL back after a failed append",
            Some(WalPosition::Offset(offset)),
        )
        .with_io(e)
    }

    /// Append refused by a writer poisoned at `offset`
    pub fn poisoned(offset: u64) -> Self {
        Self::new(
            WalErrorCode::Poisoned,
            "WAL writer is poisoned by an earlier failed append",
            Some(WalPosition::Offset(offset)),
        )
    }

    /// A record failed validation
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(WalErrorCode::Corruption, message, None)
    }

    /// A record failed validation at `position`
    pub fn corruption_at(position: WalPosition, reason: impl Into<String>) -> Self {
        Self::new(WalErrorCode::Corruption, reason, Some(position))
    }

    pub fn code(&self) -> WalErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Log position the error refers to, when known
    pub fn position(&self) -> Option<WalPosition> {
        self.position
    }

    /// Returns whether the data directory must be considered unusable
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(position) = self.position {
            write!(f, " ({})", position)?;
        }
        match self.cause {
            Some(Cause::Io(ref e)) => write!(f, ": {}", e),
            Some(Cause::Encode(ref e)) => write!(f, ": {}", e),
            None => Ok(()),
        }
    }
}

impl std::error::Error for WalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.cause {
            Some(Cause::Io(ref e)) => Some(e),
            Some(Cause::Encode(ref e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for WAL operations
pub type WalResult<T> = Result<T, WalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failure_is_not_fatal() {
        let err = WalError::write_failed(
            "write failed",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(err.code(), WalErrorCode::WriteFailed);
        assert!(!err.is_fatal());
        assert!(err.to_string().ends_with("disk full"));
    }

    #[test]
    fn test_poisoned_writer_is_fatal_and_positioned() {
        let err = WalError::poisoned(96);
        assert!(err.is_fatal());
        assert_eq!(err.position(), Some(WalPosition::Offset(96)));
        assert!(err.to_string().contains("FSEQ_WAL_POISONED"));
        assert!(err.to_string().contains("byte_offset: 96"));
    }

    #[test]
    fn test_corruption_display_carries_position() {
        let err = WalError::corruption_at(WalPosition::Sequence(7), "checksum mismatch");
        let display = err.to_string();
        assert!(err.is_fatal());
        assert!(display.starts_with("[FATAL] FSEQ_WAL_CORRUPTION"));
        assert!(display.contains("sequence_number: 7"));
    }
}
