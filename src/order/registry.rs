//! Order registry: the persisted truth of sequence order
//!
//! Positions are 1-based and always exactly `1..=N`. An insert at `p`
//! shifts every entry at `p` or later up by one, highest position first; a
//! removal at `q` shifts every later entry down by one, lowest position
//! first. Shifts and the insert or delete they belong to commit as one
//! transaction, so a failure anywhere leaves every position as it was.

use crate::observability::{log_event_with_fields, Event};
use crate::storage::{Database, OrderEntry, WriteTxn};

use super::errors::{SequenceError, SequenceResult};

/// Registry over one database
#[derive(Clone, Copy)]
pub struct OrderRegistry<'db> {
    db: &'db Database,
}

impl<'db> OrderRegistry<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Database this registry writes to
    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// All entries in ascending position order
    pub fn load_ordered(&self) -> Vec<OrderEntry> {
        self.db
            .read(|t| t.order().scan_ordered().cloned().collect())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.db.read(|t| t.order().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current position of `record_key`
    pub fn position_of(&self, record_key: &str) -> Option<u32> {
        self.db.read(|t| t.order().position_of(record_key))
    }

    /// Insert `record_key` so that it occupies `position`.
    pub fn insert_at(&self, position: u32, record_key: &str) -> SequenceResult<OrderEntry> {
        let (entry, shifted) = self.db.write(|txn| {
            let len = txn.order().len() as u32;
            Self::insert_at_in(txn, position, record_key).map(|entry| {
                let shifted = len + 1 - entry.position;
                (entry, shifted)
            })
        })?;

        log_event_with_fields(
            Event::OrderInsert,
            &[
                ("position", &entry.position.to_string()),
                ("record_key", record_key),
                ("shifted", &shifted.to_string()),
            ],
        );
        Ok(entry)
    }

    /// Remove the entry for `record_key`, closing the gap it leaves.
    pub fn remove(&self, record_key: &str) -> SequenceResult<OrderEntry> {
        let (entry, shifted) = self.db.write(|txn| {
            let len = txn.order().len() as u32;
            Self::remove_in(txn, record_key).map(|entry| {
                let shifted = len - entry.position;
                (entry, shifted)
            })
        })?;

        log_event_with_fields(
            Event::OrderRemove,
            &[
                ("position", &entry.position.to_string()),
                ("record_key", record_key),
                ("shifted", &shifted.to_string()),
            ],
        );
        Ok(entry)
    }

    /// `insert_at` inside a caller's transaction.
    ///
    /// Fails with OutOfRange unless `1 <= position <= N + 1`, Conflict if the
    /// key is already ordered, NotFound if no record backs the key.
    pub fn insert_at_in(
        txn: &mut WriteTxn<'_>,
        position: u32,
        record_key: &str,
    ) -> SequenceResult<OrderEntry> {
        let len = txn.order().len();
        if position == 0 || position as usize > len + 1 {
            return Err(SequenceError::OutOfRange {
                index: position as usize,
                len,
            });
        }

        if txn.order().get(record_key).is_some() {
            return Err(SequenceError::Conflict(format!(
                "'{}' is already in the sequence",
                record_key
            )));
        }

        if !txn.flights().contains(record_key) {
            return Err(SequenceError::NotFound(format!(
                "No record '{}' to order",
                record_key
            )));
        }

        let to_shift: Vec<(String, u32)> = txn
            .order()
            .scan_from(position)
            .rev()
            .map(|e| (e.record_key.clone(), e.position))
            .collect();

        for (key, current) in to_shift {
            txn.move_order(&key, current + 1)?;
        }

        Ok(txn.insert_order(record_key, position)?)
    }

    /// `remove` inside a caller's transaction.
    pub fn remove_in(txn: &mut WriteTxn<'_>, record_key: &str) -> SequenceResult<OrderEntry> {
        let removed = txn
            .delete_order(record_key)?
            .ok_or_else(|| SequenceError::NotFound(format!("'{}' is not in the sequence", record_key)))?;

        let to_shift: Vec<(String, u32)> = txn
            .order()
            .scan_from(removed.position + 1)
            .map(|e| (e.record_key.clone(), e.position))
            .collect();

        for (key, current) in to_shift {
            txn.move_order(&key, current - 1)?;
        }

        Ok(removed)
    }
}
