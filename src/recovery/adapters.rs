//! Recovery trait implementations for the real WAL reader and tables

use crate::storage::Tables;
use crate::wal::{WalReader, WalRecord};

use super::errors::{RecoveryError, RecoveryResult};
use super::replay::{StateApply, WalRead};

impl WalRead for WalReader {
    fn read_next(&mut self) -> RecoveryResult<Option<WalRecord>> {
        let offset = WalReader::current_offset(self);
        WalReader::read_next(self).map_err(|e| RecoveryError::wal_corruption(offset, e.to_string()))
    }

    fn current_offset(&self) -> u64 {
        WalReader::current_offset(self)
    }
}

impl StateApply for Tables {
    fn apply_record(&mut self, record: &WalRecord) -> RecoveryResult<()> {
        for mutation in &record.mutations {
            self.apply(mutation)
                .map_err(|e| RecoveryError::replay_failed(record.sequence_number, e.to_string()))?;
        }
        Ok(())
    }
}
