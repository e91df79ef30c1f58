//! WAL replay for recovery
//!
//! - Starts at byte 0 and reads sequentially
//! - Every record is checksum-validated by the reader
//! - Every mutation is applied through the same constraint checks as a
//!   live transaction
//! - On ANY corruption or rejected mutation: FATAL error, abort immediately

use crate::wal::WalRecord;

use super::errors::RecoveryResult;

/// Source of WAL records for replay
pub trait WalRead {
    /// Read the next record; `None` at end of WAL, `Err` on corruption
    fn read_next(&mut self) -> RecoveryResult<Option<WalRecord>>;

    /// Byte offset just past the last record read
    fn current_offset(&self) -> u64;
}

/// Target state that WAL records are applied to
pub trait StateApply {
    /// Apply every mutation of one record
    fn apply_record(&mut self, record: &WalRecord) -> RecoveryResult<()>;
}

/// Statistics from WAL replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of records (committed transactions) replayed
    pub records_replayed: u64,
    /// Number of row mutations applied
    pub mutations_applied: u64,
    /// Final WAL offset
    pub final_offset: u64,
    /// Final sequence number, 0 for an empty WAL
    pub final_sequence: u64,
}

/// WAL replayer that applies records in order
pub struct WalReplayer;

impl WalReplayer {
    /// Replay every remaining record from `wal` into `state`.
    ///
    /// Replaying the same WAL into fresh state always produces identical
    /// state.
    pub fn replay<W: WalRead, S: StateApply>(
        wal: &mut W,
        state: &mut S,
    ) -> RecoveryResult<ReplayStats> {
        let mut stats = ReplayStats::default();

        while let Some(record) = wal.read_next()? {
            state.apply_record(&record)?;

            stats.records_replayed += 1;
            stats.mutations_applied += record.mutations.len() as u64;
            stats.final_sequence = record.sequence_number;
        }

        stats.final_offset = wal.current_offset();

        Ok(stats)
    }
}
