//! Flight store over the database

use crate::observability::{log_event_with_fields, Event};
use crate::order::RecordStore;
use crate::storage::Database;

use super::errors::{FlightError, FlightResult};
use super::record::{Flight, NewFlight};

/// Validated access to the flight table
pub struct FlightStore<'db> {
    db: &'db Database,
}

impl<'db> FlightStore<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Validate and insert a new flight
    pub fn create(&self, input: NewFlight) -> FlightResult<Flight> {
        let flight = input.validate()?;

        let created = self.db.write(|txn| {
            if txn.flights().contains(&flight.code) {
                return Err(FlightError::DuplicateCode(flight.code.clone()));
            }
            txn.put_flight(flight.clone())?;
            Ok(flight)
        })?;

        log_event_with_fields(
            Event::FlightCreated,
            &[("code", &created.code), ("status", created.status.as_str())],
        );
        Ok(created)
    }

    /// Look up a flight by code
    pub fn find(&self, code: &str) -> FlightResult<Flight> {
        self.db
            .read(|t| t.flights().get(code).cloned())
            .ok_or_else(|| FlightError::NotFound(code.to_string()))
    }

    /// All flights ordered by code
    pub fn list(&self) -> Vec<Flight> {
        self.db.read(|t| t.flights().iter().cloned().collect())
    }

    /// Delete a flight that is not in the sequence
    pub fn delete(&self, code: &str) -> FlightResult<Flight> {
        let deleted = self.db.write(|txn| {
            if txn.order().get(code).is_some() {
                return Err(FlightError::InSequence(code.to_string()));
            }
            txn.delete_flight(code)?
                .ok_or_else(|| FlightError::NotFound(code.to_string()))
        })?;

        log_event_with_fields(Event::FlightDeleted, &[("code", code)]);
        Ok(deleted)
    }
}

impl RecordStore for FlightStore<'_> {
    type Record = Flight;

    fn get(&self, key: &str) -> Option<Flight> {
        self.db.read(|t| t.flights().get(key).cloned())
    }

    fn exists(&self, key: &str) -> bool {
        self.db.read(|t| t.flights().contains(key))
    }
}
