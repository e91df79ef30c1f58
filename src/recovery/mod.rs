//! Recovery subsystem
//!
//! The WAL is the single source of truth: on open, the tables are rebuilt
//! by replaying it sequentially from byte 0, then verified. Any corruption
//! or inconsistency halts startup.

mod adapters;
mod errors;
mod replay;
mod startup;
mod verifier;

pub use errors::{RecoveryError, RecoveryErrorCode, RecoveryResult};
pub use replay::{ReplayStats, StateApply, WalRead, WalReplayer};
pub use startup::{RecoveryManager, RecoveryState};
pub use verifier::{ConsistencyVerifier, VerificationStats};
