//! Database handle
//!
//! Owns the committed tables and the WAL writer behind one mutex. Write
//! transactions are serialized on that mutex for their full duration.
//!
//! Commit protocol:
//! 1. Run the closure against a private copy of the tables
//! 2. `Err` or panic: drop the copy, nothing was written
//! 3. Check the order positions are contiguous
//! 4. Append all recorded mutations as one WAL record and fsync
//! 5. Swap the copy in

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::fault_point::{points, FaultInjector};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::recovery::{RecoveryManager, RecoveryState};
use crate::wal::WalWriter;

use super::errors::{StorageError, StorageResult};
use super::tables::Tables;
use super::transaction::WriteTxn;

/// Options for opening a data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Run the consistency verifier after WAL replay
    pub verify_on_open: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            verify_on_open: true,
        }
    }
}

struct Inner {
    tables: Tables,
    wal: WalWriter,
}

/// Handle to one open data directory
pub struct Database {
    data_dir: PathBuf,
    inner: Mutex<Inner>,
    faults: FaultInjector,
    recovery: RecoveryState,
}

impl Database {
    /// Open (or create) a data directory with default options
    pub fn open(data_dir: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with(data_dir, DatabaseOptions::default())
    }

    /// Open (or create) a data directory.
    ///
    /// The WAL is replayed from byte 0. A corrupted or inconsistent data
    /// directory fails with a FATAL error and is never served.
    pub fn open_with(data_dir: impl AsRef<Path>, options: DatabaseOptions) -> StorageResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        fs::create_dir_all(&data_dir).map_err(|e| {
            StorageError::io_error(
                format!("Failed to create data directory: {}", data_dir.display()),
                e,
            )
        })?;

        let (tables, recovery) = RecoveryManager::new(&data_dir)
            .recover(options.verify_on_open)
            .map_err(StorageError::recovery_failed)?;

        let wal = WalWriter::open(&data_dir)
            .map_err(|e| StorageError::wal_failed("Failed to open WAL for append", e))?;

        log_event_with_fields(
            Event::DatabaseOpened,
            &[
                ("data_dir", &data_dir.display().to_string()),
                ("flights", &tables.flights().len().to_string()),
                ("order_entries", &tables.order().len().to_string()),
            ],
        );

        Ok(Self {
            data_dir,
            inner: Mutex::new(Inner { tables, wal }),
            faults: FaultInjector::new(),
            recovery,
        })
    }

    /// Data directory of this database
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Fault points of this database
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// What recovery found when this database was opened
    pub fn recovery_state(&self) -> &RecoveryState {
        &self.recovery
    }

    /// Sequence number of the last committed transaction, 0 if none
    pub fn last_sequence_number(&self) -> u64 {
        self.lock().wal.last_sequence_number()
    }

    /// Run `f` against a consistent view of the committed tables
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let inner = self.lock();
        f(&inner.tables)
    }

    /// Run `f` inside a write transaction.
    ///
    /// Commits if `f` returns `Ok`; rolls back if it returns `Err` or panics.
    /// A transaction that recorded no mutations commits without touching
    /// the WAL.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut inner = self.lock();
        let mut txn = WriteTxn::new(inner.tables.clone(), &self.faults);

        let value = match f(&mut txn) {
            Ok(value) => value,
            Err(e) => {
                Self::log_rollback(txn.mutation_count(), "transaction closure failed");
                return Err(e);
            }
        };

        let (tables, mutations) = txn.into_parts();
        if mutations.is_empty() {
            return Ok(value);
        }
        let count = mutations.len();

        if let Err(e) = tables.order().check_contiguous() {
            Self::log_rollback(count, e.message());
            return Err(e.into());
        }

        if self.faults.check(points::WAL_BEFORE_APPEND) {
            Logger::warn(
                Event::FaultInjected.as_str(),
                &[("point", points::WAL_BEFORE_APPEND)],
            );
            Self::log_rollback(count, "injected fault before WAL append");
            return Err(StorageError::write_failed("Injected fault before WAL append").into());
        }

        let sequence = match inner.wal.append(mutations) {
            Ok(sequence) => sequence,
            Err(e) => {
                let err = StorageError::wal_failed("Failed to commit transaction", e);
                Self::log_rollback(count, err.message());
                return Err(err.into());
            }
        };

        inner.tables = tables;

        log_event_with_fields(
            Event::TxnCommit,
            &[
                ("mutations", &count.to_string()),
                ("sequence", &sequence.to_string()),
            ],
        );

        Ok(value)
    }

    /// Close the database, recording a clean shutdown
    pub fn close(self) -> StorageResult<()> {
        RecoveryManager::new(&self.data_dir)
            .mark_clean_shutdown()
            .map_err(|e| StorageError::write_failed(e.to_string()))
    }

    /// A panic inside a transaction closure poisons the mutex but never
    /// reaches the committed tables, so the poisoned state is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_rollback(mutations: usize, reason: &str) {
        Logger::warn(
            Event::TxnRollback.as_str(),
            &[("mutations", &mutations.to_string()), ("reason", reason)],
        );
    }
}
