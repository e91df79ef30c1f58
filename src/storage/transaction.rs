//! Write transactions
//!
//! A `WriteTxn` works on a private copy of the committed tables and records
//! every row mutation it applies. `Database::write` turns the recorded
//! mutations into one WAL record and swaps the copy in only after the WAL
//! append is durable. Dropping a transaction without committing discards
//! everything it did.

use crate::fault_point::{points, FaultInjector};
use crate::flights::Flight;
use crate::observability::{Event, Logger};
use crate::wal::Mutation;

use super::errors::{Constraint, StorageError, StorageResult};
use super::tables::{FlightTable, OrderEntry, OrderTable, Tables};

/// An open write transaction
pub struct WriteTxn<'db> {
    tables: Tables,
    mutations: Vec<Mutation>,
    faults: &'db FaultInjector,
}

impl<'db> WriteTxn<'db> {
    pub(crate) fn new(tables: Tables, faults: &'db FaultInjector) -> Self {
        Self {
            tables,
            mutations: Vec::new(),
            faults,
        }
    }

    /// Tables as seen by this transaction, including its own writes
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Flight table as seen by this transaction
    pub fn flights(&self) -> &FlightTable {
        self.tables.flights()
    }

    /// Order table as seen by this transaction
    pub fn order(&self) -> &OrderTable {
        self.tables.order()
    }

    /// Number of mutations recorded so far
    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    /// Insert a new flight row
    pub fn put_flight(&mut self, flight: Flight) -> StorageResult<()> {
        self.record(Mutation::PutFlight { flight })
    }

    /// Delete a flight row, returning it; `None` if it did not exist
    pub fn delete_flight(&mut self, code: &str) -> StorageResult<Option<Flight>> {
        let Some(existing) = self.tables.flights().get(code).cloned() else {
            return Ok(None);
        };
        self.record(Mutation::DeleteFlight {
            code: code.to_string(),
        })?;
        Ok(Some(existing))
    }

    /// Insert a new order entry at `position` with a fresh internal id
    pub fn insert_order(&mut self, record_key: &str, position: u32) -> StorageResult<OrderEntry> {
        if self.tables.order().get(record_key).is_some() {
            return Err(StorageError::constraint_violation(
                Constraint::UniqueKey,
                format!("Record '{}' is already ordered", record_key),
            ));
        }

        let entry = OrderEntry {
            internal_id: self.tables.order().next_internal_id(),
            record_key: record_key.to_string(),
            position,
        };
        self.record(Mutation::PutOrder {
            entry: entry.clone(),
        })?;
        Ok(entry)
    }

    /// Move an existing order entry to `position`
    pub fn move_order(&mut self, record_key: &str, position: u32) -> StorageResult<OrderEntry> {
        if self.faults.check(points::REINDEX_ROW) {
            Logger::warn(
                Event::FaultInjected.as_str(),
                &[("point", points::REINDEX_ROW), ("record_key", record_key)],
            );
            return Err(StorageError::write_failed(format!(
                "Injected fault while moving '{}' to position {}",
                record_key, position
            )));
        }

        let mut entry = self.tables.order().get(record_key).cloned().ok_or_else(|| {
            StorageError::write_failed(format!("No order entry for '{}'", record_key))
        })?;
        entry.position = position;
        self.record(Mutation::PutOrder {
            entry: entry.clone(),
        })?;
        Ok(entry)
    }

    /// Delete the order entry for `record_key`, returning it; `None` if absent
    pub fn delete_order(&mut self, record_key: &str) -> StorageResult<Option<OrderEntry>> {
        let Some(existing) = self.tables.order().get(record_key).cloned() else {
            return Ok(None);
        };
        self.record(Mutation::DeleteOrder {
            record_key: record_key.to_string(),
        })?;
        Ok(Some(existing))
    }

    fn record(&mut self, mutation: Mutation) -> StorageResult<()> {
        self.tables.apply(&mutation)?;
        self.mutations.push(mutation);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Tables, Vec<Mutation>) {
        (self.tables, self.mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flights::FlightStatus;
    use chrono::NaiveDate;

    fn flight(code: &str) -> Flight {
        Flight {
            code: code.to_string(),
            status: FlightStatus::Emergency,
            departure: NaiveDate::from_ymd_opt(2025, 6, 30)
                .and_then(|d| d.and_hms_opt(6, 45, 0))
                .unwrap(),
            origin: "SCL".to_string(),
            destination: "EZE".to_string(),
        }
    }

    #[test]
    fn test_mutations_recorded_in_order() {
        let faults = FaultInjector::new();
        let mut txn = WriteTxn::new(Tables::default(), &faults);

        txn.put_flight(flight("A")).unwrap();
        txn.insert_order("A", 1).unwrap();
        txn.move_order("A", 1).unwrap();
        assert_eq!(txn.mutation_count(), 3);

        let (tables, mutations) = txn.into_parts();
        assert_eq!(tables.order().position_of("A"), Some(1));
        assert!(matches!(mutations[0], Mutation::PutFlight { .. }));
        assert!(matches!(mutations[2], Mutation::PutOrder { .. }));
    }

    #[test]
    fn test_rejected_mutation_not_recorded() {
        let faults = FaultInjector::new();
        let mut txn = WriteTxn::new(Tables::default(), &faults);

        let err = txn.insert_order("GHOST", 1).unwrap_err();
        assert_eq!(err.constraint(), Some(Constraint::ForeignKey));
        assert_eq!(txn.mutation_count(), 0);
    }

    #[test]
    fn test_insert_existing_key_is_unique_violation() {
        let faults = FaultInjector::new();
        let mut txn = WriteTxn::new(Tables::default(), &faults);
        txn.put_flight(flight("A")).unwrap();
        txn.insert_order("A", 1).unwrap();

        let err = txn.insert_order("A", 2).unwrap_err();
        assert_eq!(err.constraint(), Some(Constraint::UniqueKey));
    }

    #[test]
    fn test_absent_rows_are_noops() {
        let faults = FaultInjector::new();
        let mut txn = WriteTxn::new(Tables::default(), &faults);

        assert!(txn.delete_flight("A").unwrap().is_none());
        assert!(txn.delete_order("A").unwrap().is_none());
        assert_eq!(txn.mutation_count(), 0);
    }

    #[test]
    fn test_reindex_fault_fails_move() {
        let faults = FaultInjector::new();
        let mut txn = WriteTxn::new(Tables::default(), &faults);
        txn.put_flight(flight("A")).unwrap();
        txn.insert_order("A", 1).unwrap();

        faults.arm(points::REINDEX_ROW, 1);
        assert!(txn.move_order("A", 2).is_err());
        assert_eq!(txn.order().position_of("A"), Some(1));
    }
}
