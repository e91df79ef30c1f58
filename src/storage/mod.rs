//! Embedded storage engine
//!
//! In-memory tables rebuilt from the WAL on open, changed only through
//! write transactions that commit as one WAL record each.
//!
//! Constraints enforced on every row change, live or replayed:
//! - flight codes and order record keys are unique
//! - order positions are unique
//! - an order entry references an existing flight
//! - a flight cannot be deleted while it has an order entry
//!
//! Order positions must also be exactly `1..=N` when a transaction commits.

mod database;
mod errors;
mod tables;
mod transaction;

pub use database::{Database, DatabaseOptions};
pub use errors::{Constraint, StorageError, StorageErrorCode, StorageResult};
pub use tables::{FlightTable, OrderEntry, OrderTable, Tables};
pub use transaction::WriteTxn;
