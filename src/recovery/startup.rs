//! Recovery Manager startup sequence
//!
//! Steps, in this order:
//!
//! 1. Check for the clean shutdown marker
//! 2. Replay the WAL from byte 0 into empty tables
//! 3. Verify consistency (unless disabled by configuration)
//! 4. Remove the shutdown marker

use std::fs;
use std::path::{Path, PathBuf};

use crate::observability::{log_event_with_fields, Event, ObservationScope, Severity};
use crate::storage::Tables;
use crate::wal::WalReader;

use super::errors::{RecoveryError, RecoveryResult};
use super::replay::{ReplayStats, WalReplayer};
use super::verifier::{ConsistencyVerifier, VerificationStats};

/// Clean shutdown marker filename
const CLEAN_SHUTDOWN_MARKER: &str = "clean_shutdown";

/// Outcome of a successful recovery
#[derive(Debug, Clone)]
pub struct RecoveryState {
    /// WAL replay statistics
    pub replay_stats: ReplayStats,
    /// Verification statistics, `None` when verification was skipped
    pub verification_stats: Option<VerificationStats>,
    /// Whether the previous process shut down cleanly
    pub was_clean_shutdown: bool,
}

/// Recovery Manager for one data directory
pub struct RecoveryManager {
    data_dir: PathBuf,
}

impl RecoveryManager {
    /// Creates a recovery manager for `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn marker_path(&self) -> PathBuf {
        self.data_dir.join(CLEAN_SHUTDOWN_MARKER)
    }

    fn wal_path(&self) -> PathBuf {
        self.data_dir.join("wal").join("wal.log")
    }

    /// Check if the clean shutdown marker exists
    pub fn was_clean_shutdown(&self) -> bool {
        self.marker_path().exists()
    }

    /// Write the clean shutdown marker
    pub fn mark_clean_shutdown(&self) -> RecoveryResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            RecoveryError::recovery_failed(format!("Failed to create data directory: {}", e))
        })?;
        fs::write(self.marker_path(), b"").map_err(|e| {
            RecoveryError::recovery_failed(format!("Failed to write shutdown marker: {}", e))
        })
    }

    fn remove_shutdown_marker(&self) -> RecoveryResult<()> {
        let path = self.marker_path();
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                RecoveryError::recovery_failed(format!("Failed to remove shutdown marker: {}", e))
            })?;
        }
        Ok(())
    }

    /// Rebuild the tables of this data directory.
    ///
    /// The WAL is always replayed in full, even after a clean shutdown.
    pub fn recover(&self, verify: bool) -> RecoveryResult<(Tables, RecoveryState)> {
        let data_dir = self.data_dir.display().to_string();
        let scope = ObservationScope::with_fields("RECOVERY", &[("data_dir", &data_dir)]);

        match self.run(verify) {
            Ok((tables, state)) => {
                let records = state.replay_stats.records_replayed.to_string();
                let entries = tables.order().len().to_string();
                scope.complete_with_fields(&[
                    ("records_replayed", &records),
                    ("order_entries", &entries),
                ]);
                Ok((tables, state))
            }
            Err(e) => {
                scope.fail(Severity::Fatal, &e.to_string());
                Err(e)
            }
        }
    }

    fn run(&self, verify: bool) -> RecoveryResult<(Tables, RecoveryState)> {
        let was_clean_shutdown = self.was_clean_shutdown();
        let mut tables = Tables::default();

        let replay_stats = if self.wal_path().exists() {
            let mut reader = WalReader::open(&self.wal_path()).map_err(|e| {
                RecoveryError::recovery_failed(format!("Failed to open WAL: {}", e))
            })?;
            WalReplayer::replay(&mut reader, &mut tables)?
        } else {
            ReplayStats::default()
        };

        let final_sequence = replay_stats.final_sequence.to_string();
        let mutations = replay_stats.mutations_applied.to_string();
        log_event_with_fields(
            Event::WalReplayed,
            &[("final_sequence", &final_sequence), ("mutations", &mutations)],
        );

        let verification_stats = if verify {
            let stats = ConsistencyVerifier::verify(&tables)?;
            log_event_with_fields(
                Event::ConsistencyVerified,
                &[("order_entries", &stats.order_entries.to_string())],
            );
            Some(stats)
        } else {
            None
        };

        self.remove_shutdown_marker()?;

        Ok((
            tables,
            RecoveryState {
                replay_stats,
                verification_stats,
                was_clean_shutdown,
            },
        ))
    }
}
