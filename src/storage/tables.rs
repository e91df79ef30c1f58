//! In-memory tables rebuilt from the WAL
//!
//! Two tables live here:
//!
//! - `flights`: flight rows keyed by code
//! - `order`: order entries, unique by record key and by position, each
//!   referencing an existing flight
//!
//! Every change goes through `Tables::apply`, which checks all constraints
//! before touching anything, so a rejected mutation leaves the tables as
//! they were.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::{Constraint, StorageError, StorageResult};
use crate::flights::Flight;
use crate::wal::Mutation;

/// Persisted order row: a record key bound to a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderEntry {
    /// Storage-assigned id, unique and never reused
    pub internal_id: u64,
    /// Key of the ordered record (flight code)
    pub record_key: String,
    /// 1-based rank in the sequence
    pub position: u32,
}

/// Flight rows keyed by code
#[derive(Debug, Clone, Default)]
pub struct FlightTable {
    rows: BTreeMap<String, Flight>,
}

impl FlightTable {
    /// Returns the flight with `code`, if any
    pub fn get(&self, code: &str) -> Option<&Flight> {
        self.rows.get(code)
    }

    /// Returns whether a flight with `code` exists
    pub fn contains(&self, code: &str) -> bool {
        self.rows.contains_key(code)
    }

    /// Number of flights
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flights in code order
    pub fn iter(&self) -> impl Iterator<Item = &Flight> {
        self.rows.values()
    }
}

/// Order entries indexed by position and by record key
#[derive(Debug, Clone)]
pub struct OrderTable {
    by_position: BTreeMap<u32, OrderEntry>,
    position_of: HashMap<String, u32>,
    next_internal_id: u64,
}

impl Default for OrderTable {
    fn default() -> Self {
        Self {
            by_position: BTreeMap::new(),
            position_of: HashMap::new(),
            next_internal_id: 1,
        }
    }
}

impl OrderTable {
    /// Number of entries
    pub fn len(&self) -> usize {
        self.by_position.len()
    }

    /// Returns whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    /// Returns the entry for `record_key`, if any
    pub fn get(&self, record_key: &str) -> Option<&OrderEntry> {
        self.position_of
            .get(record_key)
            .and_then(|p| self.by_position.get(p))
    }

    /// Returns the position of `record_key`, if any
    pub fn position_of(&self, record_key: &str) -> Option<u32> {
        self.position_of.get(record_key).copied()
    }

    /// Returns the entry at `position`, if any
    pub fn at_position(&self, position: u32) -> Option<&OrderEntry> {
        self.by_position.get(&position)
    }

    /// All entries in ascending position order
    pub fn scan_ordered(&self) -> impl DoubleEndedIterator<Item = &OrderEntry> {
        self.by_position.values()
    }

    /// Entries with `position >= from`, ascending
    pub fn scan_from(&self, from: u32) -> impl DoubleEndedIterator<Item = &OrderEntry> {
        self.by_position.range(from..).map(|(_, entry)| entry)
    }

    /// Id the next inserted entry will receive
    pub fn next_internal_id(&self) -> u64 {
        self.next_internal_id
    }

    /// Fails unless positions are exactly `1..=len`.
    ///
    /// Positions are unique keys of a sorted map, so checking both ends is
    /// enough.
    pub fn check_contiguous(&self) -> StorageResult<()> {
        let len = self.by_position.len();
        let first = self.by_position.keys().next().copied();
        let last = self.by_position.keys().next_back().copied();

        match (first, last) {
            (None, None) => Ok(()),
            (Some(1), Some(last)) if last as usize == len => Ok(()),
            _ => Err(StorageError::constraint_violation(
                Constraint::UniquePosition,
                format!(
                    "Order positions are not contiguous: first {:?}, last {:?}, count {}",
                    first, last, len
                ),
            )),
        }
    }

    fn put(&mut self, entry: &OrderEntry, flights: &FlightTable) -> StorageResult<()> {
        if entry.position == 0 {
            return Err(StorageError::write_failed(format!(
                "Order entry '{}' has position 0; positions start at 1",
                entry.record_key
            )));
        }

        let current = self.get(&entry.record_key).cloned();

        if let Some(ref current) = current {
            if current.internal_id != entry.internal_id {
                return Err(StorageError::constraint_violation(
                    Constraint::UniqueKey,
                    format!("Record '{}' is already ordered", entry.record_key),
                ));
            }
        } else if !flights.contains(&entry.record_key) {
            return Err(StorageError::constraint_violation(
                Constraint::ForeignKey,
                format!("Flight '{}' does not exist", entry.record_key),
            ));
        }

        if let Some(occupant) = self.by_position.get(&entry.position) {
            if occupant.record_key != entry.record_key {
                return Err(StorageError::constraint_violation(
                    Constraint::UniquePosition,
                    format!(
                        "Position {} is held by '{}'",
                        entry.position, occupant.record_key
                    ),
                ));
            }
        }

        if let Some(current) = current {
            self.by_position.remove(&current.position);
        }
        self.position_of
            .insert(entry.record_key.clone(), entry.position);
        self.by_position.insert(entry.position, entry.clone());
        self.next_internal_id = self.next_internal_id.max(entry.internal_id + 1);

        Ok(())
    }

    fn delete(&mut self, record_key: &str) -> StorageResult<OrderEntry> {
        let position = self.position_of.remove(record_key).ok_or_else(|| {
            StorageError::write_failed(format!("No order entry for '{}'", record_key))
        })?;
        self.by_position.remove(&position).ok_or_else(|| {
            StorageError::data_corruption(format!(
                "Order index lists '{}' at position {} but the row is missing",
                record_key, position
            ))
        })
    }
}

/// Complete table state of one data directory
#[derive(Debug, Clone, Default)]
pub struct Tables {
    flights: FlightTable,
    order: OrderTable,
}

impl Tables {
    /// Flight table
    pub fn flights(&self) -> &FlightTable {
        &self.flights
    }

    /// Order table
    pub fn order(&self) -> &OrderTable {
        &self.order
    }

    /// Applies one mutation, enforcing every table constraint.
    pub fn apply(&mut self, mutation: &Mutation) -> StorageResult<()> {
        match mutation {
            Mutation::PutFlight { flight } => {
                if self.flights.contains(&flight.code) {
                    return Err(StorageError::constraint_violation(
                        Constraint::UniqueKey,
                        format!("Flight '{}' already exists", flight.code),
                    ));
                }
                self.flights.rows.insert(flight.code.clone(), flight.clone());
                Ok(())
            }
            Mutation::DeleteFlight { code } => {
                if self.order.position_of(code).is_some() {
                    return Err(StorageError::constraint_violation(
                        Constraint::Restrict,
                        format!("Flight '{}' is still in the sequence", code),
                    ));
                }
                self.flights
                    .rows
                    .remove(code)
                    .map(|_| ())
                    .ok_or_else(|| {
                        StorageError::write_failed(format!("Flight '{}' does not exist", code))
                    })
            }
            Mutation::PutOrder { entry } => self.order.put(entry, &self.flights),
            Mutation::DeleteOrder { record_key } => self.order.delete(record_key).map(|_| ()),
        }
    }
}
