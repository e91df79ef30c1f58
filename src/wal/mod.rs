//! Write-Ahead Log (WAL) subsystem for flightseq
//!
//! The WAL is the only durable artifact. Table state is rebuilt from it on
//! every open, so a transaction exists if and only if its record is fully
//! persisted here.
//!
//! # Design Principles
//!
//! - One record per committed transaction (all row mutations together)
//! - fsync before the commit is acknowledged
//! - Checksum on every record, verified on every read
//! - Halt on corruption; no skipping, no repair
//!
//! A torn append is cut back to the previous record boundary before the
//! error is returned, so a failed commit never leaves bytes behind. If the
//! cut itself fails, the writer is poisoned and refuses every later append.

mod errors;
mod reader;
mod record;
mod writer;

pub use errors::{Severity, WalError, WalErrorCode, WalPosition, WalResult};
pub use reader::WalReader;
pub use record::{compute_checksum, Mutation, WalRecord};
pub use writer::{WalFile, WalWriter};
