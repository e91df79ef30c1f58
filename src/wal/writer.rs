//! WAL writer with fsync enforcement
//!
//! - Every append is followed by fsync
//! - The sequence number only advances after a successful fsync
//! - A failed append truncates the file back to the last record boundary
//! - If that truncation fails, the writer is poisoned and refuses every
//!   later append

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::errors::{WalError, WalResult};
use super::reader::WalReader;
use super::record::{Mutation, WalRecord};

/// File operations the writer relies on
pub trait WalFile {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn sync_all(&mut self) -> io::Result<()>;
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl WalFile for File {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Write::write_all(self, buf)
    }

    fn sync_all(&mut self) -> io::Result<()> {
        File::sync_all(self)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

/// Append-only WAL writer for `<data_dir>/wal/wal.log`.
pub struct WalWriter<F: WalFile = File> {
    wal_path: PathBuf,
    file: F,
    /// Next sequence number to assign (starts at 1, never reused)
    next_sequence: u64,
    /// Byte length of the valid prefix of the file
    end_offset: u64,
    /// Set when a failed append could not be cut back
    poisoned: bool,
}

impl WalWriter<File> {
    /// Opens or creates the WAL under `data_dir`.
    ///
    /// Existing records are scanned to find the next sequence number; a
    /// corrupted file is refused.
    pub fn open(data_dir: &Path) -> WalResult<Self> {
        let wal_dir = data_dir.join("wal");
        let wal_path = wal_dir.join("wal.log");

        if !wal_dir.exists() {
            fs::create_dir_all(&wal_dir).map_err(|e| {
                WalError::write_failed(
                    format!("Failed to create WAL directory: {}", wal_dir.display()),
                    e,
                )
            })?;
        }

        let (last_sequence, end_offset) = Self::scan_existing(&wal_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)
            .map_err(|e| {
                WalError::write_failed(
                    format!("Failed to open WAL file: {}", wal_path.display()),
                    e,
                )
            })?;

        Ok(Self::from_parts(wal_path, file, last_sequence, end_offset))
    }

    /// Returns (last sequence number, valid length) of an existing WAL.
    fn scan_existing(wal_path: &Path) -> WalResult<(u64, u64)> {
        let metadata = match fs::metadata(wal_path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, 0)),
            Err(e) => return Err(WalError::write_failed("Failed to read WAL metadata", e)),
        };

        if metadata.len() == 0 {
            return Ok((0, 0));
        }

        let mut reader = WalReader::open(wal_path)?;
        while reader.read_next()?.is_some() {}

        Ok((reader.last_sequence_number(), reader.current_offset()))
    }
}

impl<F: WalFile> WalWriter<F> {
    fn from_parts(wal_path: PathBuf, file: F, last_sequence: u64, end_offset: u64) -> Self {
        Self {
            wal_path,
            file,
            next_sequence: last_sequence + 1,
            end_offset,
            poisoned: false,
        }
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    /// Returns the next sequence number that will be assigned.
    pub fn next_sequence_number(&self) -> u64 {
        self.next_sequence
    }

    /// Returns the last assigned sequence number, or 0 if none.
    pub fn last_sequence_number(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Returns whether an earlier failure left the file in an unknown state
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Appends one transaction's mutations as a single record and fsyncs.
    ///
    /// Returns the sequence number assigned to the record. On failure the
    /// file is cut back to the previous record; if that fails too, the
    /// truncation error is returned and the writer is poisoned.
    pub fn append(&mut self, mutations: Vec<Mutation>) -> WalResult<u64> {
        if self.poisoned {
            return Err(WalError::poisoned(self.end_offset));
        }

        let sequence_number = self.next_sequence;
        let serialized = WalRecord::new(sequence_number, mutations).serialize()?;

        if let Err(e) = self.file.write_all(&serialized) {
            self.discard_tail()?;
            return Err(WalError::write_failed(
                format!("Failed to write WAL record at sequence {}", sequence_number),
                e,
            ));
        }

        if let Err(e) = self.file.sync_all() {
            self.discard_tail()?;
            return Err(WalError::fsync_failed(sequence_number, e));
        }

        self.next_sequence += 1;
        self.end_offset += serialized.len() as u64;

        Ok(sequence_number)
    }

    /// Cuts the file back to the last complete record.
    fn discard_tail(&mut self) -> WalResult<()> {
        let cut = self
            .file
            .set_len(self.end_offset)
            .and_then(|()| self.file.sync_all());
        cut.map_err(|e| {
            self.poisoned = true;
            WalError::cut_back_failed(self.end_offset, e)
        })
    }
}
