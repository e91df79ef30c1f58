//! # Flight Errors

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for flight operations
pub type FlightResult<T> = Result<T, FlightError>;

/// Flight record errors
#[derive(Debug, Error)]
pub enum FlightError {
    #[error("Flight code already exists: {0}")]
    DuplicateCode(String),

    #[error("Invalid flight code '{0}': must be 1-32 characters without whitespace")]
    InvalidCode(String),

    #[error("Invalid flight status: {0}")]
    InvalidStatus(String),

    #[error("Invalid departure: {0}")]
    InvalidDeparture(String),

    #[error("Flight not found: {0}")]
    NotFound(String),

    #[error("Flight {0} is in the sequence and must be extracted first")]
    InSequence(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl FlightError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FlightError::DuplicateCode(_) => "FLIGHT_DUPLICATE_CODE",
            FlightError::InvalidCode(_) => "FLIGHT_INVALID_CODE",
            FlightError::InvalidStatus(_) => "FLIGHT_INVALID_STATUS",
            FlightError::InvalidDeparture(_) => "FLIGHT_INVALID_DEPARTURE",
            FlightError::NotFound(_) => "FLIGHT_NOT_FOUND",
            FlightError::InSequence(_) => "FLIGHT_IN_SEQUENCE",
            FlightError::Storage(_) => "FLIGHT_STORAGE_FAILURE",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            FlightError::DuplicateCode(_) => 409,
            FlightError::InvalidCode(_) => 400,
            FlightError::InvalidStatus(_) => 400,
            FlightError::InvalidDeparture(_) => 400,
            FlightError::NotFound(_) => 404,
            FlightError::InSequence(_) => 409,
            FlightError::Storage(_) => 503,
        }
    }
}
