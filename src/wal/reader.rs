//! WAL reader with strict corruption detection
//!
//! - Records are read strictly in sequence order, starting from byte 0
//! - Sequence numbers must start at 1 and increase by exactly 1
//! - Any checksum failure, truncation or gap is a corruption error

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalPosition, WalResult};
use super::record::WalRecord;

/// Smallest possible record: length + sequence + payload length + checksum
const MIN_RECORD_SIZE: u64 = 4 + 8 + 4 + 4;

/// Sequential WAL reader used by recovery and by the writer on open.
pub struct WalReader {
    wal_path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
    last_sequence: u64,
}

impl WalReader {
    /// Opens a WAL file for reading.
    pub fn open(wal_path: &Path) -> WalResult<Self> {
        let file = File::open(wal_path).map_err(|e| {
            WalError::corruption(format!(
                "Failed to open WAL file: {}: {}",
                wal_path.display(),
                e
            ))
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| WalError::corruption(format!("Failed to read WAL metadata: {}", e)))?
            .len();

        Ok(Self {
            wal_path: wal_path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
            last_sequence: 0,
        })
    }

    /// Opens the WAL at `<data_dir>/wal/wal.log`.
    pub fn open_from_data_dir(data_dir: &Path) -> WalResult<Self> {
        Self::open(&data_dir.join("wal").join("wal.log"))
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    /// Returns the byte offset just past the last record read.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Returns the last successfully read sequence number.
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence
    }

    /// Reads the next record.
    ///
    /// - `Ok(Some(record))` if a record was read
    /// - `Ok(None)` at a clean end of file
    /// - `Err(FSEQ_WAL_CORRUPTION)` on any validation failure
    pub fn read_next(&mut self) -> WalResult<Option<WalRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_RECORD_SIZE {
            return Err(WalError::corruption_at(
                WalPosition::Offset(self.current_offset),
                format!(
                    "Truncated WAL: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader
            .read_exact(&mut len_buf)
            .map_err(|e| self.read_error("Failed to read record length", e))?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE {
            return Err(WalError::corruption_at(
                WalPosition::Offset(self.current_offset),
                format!("Invalid record length: {}", record_length),
            ));
        }

        if record_length > remaining {
            return Err(WalError::corruption_at(
                WalPosition::Offset(self.current_offset),
                format!(
                    "Record length {} exceeds remaining file size {}",
                    record_length, remaining
                ),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[..4].copy_from_slice(&len_buf);
        self.reader
            .read_exact(&mut record_buf[4..])
            .map_err(|e| self.read_error("Failed to read record body", e))?;

        let (record, bytes_consumed) = WalRecord::deserialize(&record_buf)
            .map_err(|e| {
                WalError::corruption_at(WalPosition::Offset(self.current_offset), e.to_string())
            })?;

        let expected = self.last_sequence + 1;
        if record.sequence_number != expected {
            return Err(WalError::corruption_at(
                WalPosition::Sequence(record.sequence_number),
                format!(
                    "Non-sequential sequence number: expected {}, got {}",
                    expected, record.sequence_number
                ),
            ));
        }

        self.current_offset += bytes_consumed as u64;
        self.last_sequence = record.sequence_number;

        Ok(Some(record))
    }

    /// Reads every remaining record.
    pub fn read_all(&mut self) -> WalResult<Vec<WalRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }

    fn read_error(&self, what: &str, e: io::Error) -> WalError {
        WalError::corruption_at(
            WalPosition::Offset(self.current_offset),
            format!("{}: {}", what, e),
        )
    }
}
