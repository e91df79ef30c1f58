//! # Sequence Errors

use thiserror::Error;

use crate::storage::{Constraint, StorageError, StorageErrorCode};

/// Result type for order registry and sequence view operations
pub type SequenceResult<T> = Result<T, SequenceError>;

/// Order maintenance errors
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Index {index} out of range for sequence of length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Ordered record has no backing record: {0}")]
    RecordMissing(String),

    #[error("Storage failure: {0}")]
    StorageFailure(#[source] StorageError),
}

impl SequenceError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SequenceError::NotFound(_) => "SEQ_NOT_FOUND",
            SequenceError::Conflict(_) => "SEQ_CONFLICT",
            SequenceError::OutOfRange { .. } => "SEQ_OUT_OF_RANGE",
            SequenceError::InvalidArgument(_) => "SEQ_INVALID_ARGUMENT",
            SequenceError::RecordMissing(_) => "SEQ_RECORD_MISSING",
            SequenceError::StorageFailure(_) => "SEQ_STORAGE_FAILURE",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            SequenceError::NotFound(_) => 404,
            SequenceError::Conflict(_) => 409,
            SequenceError::OutOfRange { .. } => 416,
            SequenceError::InvalidArgument(_) => 400,
            SequenceError::RecordMissing(_) => 500,
            SequenceError::StorageFailure(_) => 503,
        }
    }
}

/// Constraint violations become the kind a caller can act on; everything
/// else is a storage failure.
impl From<StorageError> for SequenceError {
    fn from(err: StorageError) -> Self {
        if err.code() != StorageErrorCode::ConstraintViolation {
            return SequenceError::StorageFailure(err);
        }
        match err.constraint() {
            Some(Constraint::ForeignKey) => SequenceError::NotFound(err.message().to_string()),
            _ => SequenceError::Conflict(err.message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_distinct_status() {
        let errors = [
            SequenceError::NotFound("a".into()),
            SequenceError::Conflict("a".into()),
            SequenceError::OutOfRange { index: 3, len: 3 },
            SequenceError::InvalidArgument("a".into()),
            SequenceError::RecordMissing("a".into()),
            SequenceError::StorageFailure(StorageError::write_failed("a")),
        ];

        let mut statuses: Vec<u16> = errors.iter().map(|e| e.status_code()).collect();
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses.len(), errors.len());

        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_storage_error_mapping() {
        let fk = StorageError::constraint_violation(Constraint::ForeignKey, "no flight");
        assert!(matches!(SequenceError::from(fk), SequenceError::NotFound(_)));

        let pos = StorageError::constraint_violation(Constraint::UniquePosition, "taken");
        assert!(matches!(SequenceError::from(pos), SequenceError::Conflict(_)));

        let io = StorageError::write_failed("fsync");
        assert!(matches!(
            SequenceError::from(io),
            SequenceError::StorageFailure(_)
        ));
    }

    #[test]
    fn test_out_of_range_display() {
        let err = SequenceError::OutOfRange { index: 5, len: 2 };
        assert_eq!(err.to_string(), "Index 5 out of range for sequence of length 2");
    }
}
