//! WAL record types and framing
//!
//! Each committed transaction becomes exactly one record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record including this field)
//! +------------------+
//! | Sequence Number  | (u64 LE, starts at 1, +1 per record)
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Payload          | (JSON array of mutations)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of every preceding byte)
//! +------------------+
//! ```

use std::io;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::errors::{WalError, WalResult};
use crate::flights::Flight;
use crate::storage::OrderEntry;

/// Fixed overhead of a record: length + sequence + payload length + checksum
const RECORD_OVERHEAD: usize = 4 + 8 + 4 + 4;

/// Computes a CRC32 (IEEE) checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// A single row-level change made by a transaction.
///
/// Replay applies mutations in the order they were recorded, through the
/// same constraint checks the live transaction went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    /// Insert a flight row
    PutFlight {
        /// Full flight row
        flight: Flight,
    },
    /// Delete a flight row
    DeleteFlight {
        /// Flight code
        code: String,
    },
    /// Insert an order entry, or move an existing one to a new position
    PutOrder {
        /// Full post-operation row
        entry: OrderEntry,
    },
    /// Delete an order entry
    DeleteOrder {
        /// Key of the removed entry
        record_key: String,
    },
}

/// One committed transaction as persisted in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    /// Monotonic commit sequence number
    pub sequence_number: u64,
    /// Row mutations in application order
    pub mutations: Vec<Mutation>,
}

impl WalRecord {
    /// Create a new WAL record
    pub fn new(sequence_number: u64, mutations: Vec<Mutation>) -> Self {
        Self {
            sequence_number,
            mutations,
        }
    }

    /// Serialize the complete record to bytes.
    pub fn serialize(&self) -> WalResult<Vec<u8>> {
        let payload = serde_json::to_vec(&self.mutations)
            .map_err(|e| WalError::encode_failed(self.sequence_number, e))?;

        let record_length = RECORD_OVERHEAD + payload.len();
        let record_length = u32::try_from(record_length)
            .map_err(|_| WalError::frame_too_large(self.sequence_number, record_length))?;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&self.sequence_number.to_le_bytes());
        record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        record.extend_from_slice(&payload);

        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        Ok(record)
    }

    /// Deserialize a record from bytes, verifying checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < RECORD_OVERHEAD {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = read_u32(data, 0) as usize;

        if record_length < RECORD_OVERHEAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = read_u32(data, checksum_offset);
        let computed_checksum = compute_checksum(&data[..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut seq_buf = [0u8; 8];
        seq_buf.copy_from_slice(&data[4..12]);
        let sequence_number = u64::from_le_bytes(seq_buf);

        let payload_length = read_u32(data, 12) as usize;
        if 16 + payload_length != checksum_offset {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Payload length {} does not match record length {}",
                    payload_length, record_length
                ),
            ));
        }

        let mutations: Vec<Mutation> = serde_json::from_slice(&data[16..checksum_offset])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        Ok((
            Self {
                sequence_number,
                mutations,
            },
            record_length,
        ))
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flights::FlightStatus;
    use chrono::NaiveDate;

    fn sample_record() -> WalRecord {
        let departure = NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();
        WalRecord::new(
            3,
            vec![
                Mutation::PutFlight {
                    flight: Flight {
                        code: "AV101".to_string(),
                        status: FlightStatus::Scheduled,
                        departure,
                        origin: "BOG".to_string(),
                        destination: "MDE".to_string(),
                    },
                },
                Mutation::PutOrder {
                    entry: OrderEntry {
                        internal_id: 1,
                        record_key: "AV101".to_string(),
                        position: 1,
                    },
                },
            ],
        )
    }

    #[test]
    fn test_record_roundtrip() {
        let record = sample_record();
        let bytes = record.serialize().unwrap();
        let (decoded, consumed) = WalRecord::deserialize(&bytes).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut bytes = sample_record().serialize().unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;

        let err = WalRecord::deserialize(&bytes).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let bytes = sample_record().serialize().unwrap();
        let err = WalRecord::deserialize(&bytes[..bytes.len() - 3]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_mutation_tagging() {
        let json = serde_json::to_value(Mutation::DeleteOrder {
            record_key: "AV101".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "delete_order");
        assert_eq!(json["record_key"], "AV101");
    }
}
