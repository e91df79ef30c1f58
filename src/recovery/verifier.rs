//! Consistency verifier for recovery
//!
//! Runs over the replayed tables before the database is served:
//! - order positions are exactly `1..=N`
//! - every order entry references an existing flight
//! - internal ids are unique
//! - the key index agrees with the position index

use std::collections::HashSet;

use crate::storage::Tables;

use super::errors::{RecoveryError, RecoveryResult};

/// Verification statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationStats {
    /// Flights checked
    pub flights: u64,
    /// Order entries checked
    pub order_entries: u64,
}

/// Consistency verifier over replayed tables
pub struct ConsistencyVerifier;

impl ConsistencyVerifier {
    /// Verify the tables, returning FATAL `Inconsistent` on the first violation.
    pub fn verify(tables: &Tables) -> RecoveryResult<VerificationStats> {
        let order = tables.order();
        let flights = tables.flights();
        let mut seen_ids = HashSet::with_capacity(order.len());

        for (expected, entry) in (1u32..).zip(order.scan_ordered()) {
            if entry.position != expected {
                return Err(RecoveryError::inconsistent(format!(
                    "Order positions are not contiguous: expected {}, found {} for '{}'",
                    expected, entry.position, entry.record_key
                )));
            }

            if !flights.contains(&entry.record_key) {
                return Err(RecoveryError::inconsistent(format!(
                    "Order entry at position {} references missing flight '{}'",
                    entry.position, entry.record_key
                )));
            }

            if !seen_ids.insert(entry.internal_id) {
                return Err(RecoveryError::inconsistent(format!(
                    "Internal id {} is used by more than one order entry",
                    entry.internal_id
                )));
            }

            if order.position_of(&entry.record_key) != Some(entry.position) {
                return Err(RecoveryError::inconsistent(format!(
                    "Key index disagrees with position index for '{}'",
                    entry.record_key
                )));
            }
        }

        Ok(VerificationStats {
            flights: flights.len() as u64,
            order_entries: order.len() as u64,
        })
    }
}
