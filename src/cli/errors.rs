//! CLI-specific error types
//!
//! A CLI error ends the process with a non-zero exit code. Errors of a
//! single request are not CLI errors; they are written as error responses
//! and the session continues.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::order::SequenceError;
use crate::storage::StorageError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// Failures of a CLI command as a whole
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON in {}: {source}", .path.display())]
    ConfigMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigInvalid(String),

    #[error("Data directory already initialized: {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("Data directory not initialized: {}. Run 'flightseq init' first.", .0.display())]
    NotInitialized(PathBuf),

    #[error("Data directory {} cannot be served: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error("Failed to record clean shutdown: {0}")]
    CloseFailed(#[source] StorageError),

    #[error("Failed to load sequence: {0}")]
    SequenceUnavailable(#[from] SequenceError),

    #[error("Empty request on stdin")]
    EmptyRequest,

    #[error("Failed to read request from stdin: {0}")]
    Stdin(#[source] io::Error),

    #[error("Failed to write response to stdout: {0}")]
    Stdout(#[source] io::Error),
}

impl CliError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::ConfigUnreadable { .. }
            | CliError::ConfigMalformed { .. }
            | CliError::ConfigInvalid(_) => "FSEQ_CLI_CONFIG_ERROR",
            CliError::AlreadyInitialized(_) => "FSEQ_CLI_ALREADY_INITIALIZED",
            CliError::NotInitialized(_) => "FSEQ_CLI_NOT_INITIALIZED",
            CliError::OpenFailed { .. } => "FSEQ_CLI_OPEN_FAILED",
            CliError::CloseFailed(_) => "FSEQ_CLI_CLOSE_FAILED",
            CliError::SequenceUnavailable(_) => "FSEQ_CLI_SEQUENCE_UNAVAILABLE",
            CliError::EmptyRequest => "FSEQ_CLI_EMPTY_REQUEST",
            CliError::Stdin(_) => "FSEQ_CLI_STDIN_ERROR",
            CliError::Stdout(_) => "FSEQ_CLI_STDOUT_ERROR",
        }
    }

    /// HTTP-like status used when the error is also reported as a response
    pub fn status_code(&self) -> u16 {
        match self {
            CliError::EmptyRequest | CliError::Stdin(_) => 400,
            CliError::OpenFailed { .. } | CliError::SequenceUnavailable(_) => 503,
            _ => 500,
        }
    }

    /// Whether the data directory refused to open because it failed recovery
    pub fn is_fatal(&self) -> bool {
        matches!(self, CliError::OpenFailed { source, .. } if source.is_fatal())
    }
}
