//! flightseq - durable manual ordering of flights
//!
//! A small embedded store that keeps a user-defined order over flight
//! records. Positions are persisted densely as `1..=N`; every reorder is a
//! single atomic write transaction backed by a checksummed WAL.
//!
//! Layers, bottom up:
//!
//! - `wal`: append-only, fsynced log of committed transactions
//! - `storage`: in-memory tables, constraints and write transactions
//! - `recovery`: WAL replay and consistency verification on open
//! - `flights`: flight records and their store
//! - `order`: the order registry and the linked sequence view over it
//! - `cli`: JSON request/response front end

pub mod cli;
pub mod fault_point;
pub mod flights;
pub mod observability;
pub mod order;
pub mod recovery;
pub mod storage;
pub mod wal;
