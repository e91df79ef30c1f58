//! Observable events
//!
//! Events are explicit and typed; every log line the crate writes uses one
//! of these names.

use std::fmt;

/// Observable events in flightseq
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded by the CLI
    ConfigLoaded,
    /// Database handle ready for requests
    DatabaseOpened,
    /// `serve` loop accepting requests
    Serving,

    // Recovery
    /// WAL replay finished
    WalReplayed,
    /// Consistency verification passed
    ConsistencyVerified,
    /// WAL corruption detected (FATAL)
    WalCorruption,
    /// Recovery failed (FATAL)
    RecoveryFailed,

    // Transactions
    /// Write transaction committed
    TxnCommit,
    /// Write transaction rolled back
    TxnRollback,
    /// A fault point fired
    FaultInjected,

    // Order registry
    /// Entry inserted with its shift
    OrderInsert,
    /// Entry removed with its shift
    OrderRemove,

    // Sequence view
    /// View materialized from the registry
    SequenceLoaded,
    /// View rank disagreed with the registry
    SequenceConflict,
    /// Node spliced into a view
    NodeInserted,
    /// Node unlinked from a view
    NodeExtracted,

    // Flights
    /// Flight created
    FlightCreated,
    /// Flight deleted
    FlightDeleted,

    // Requests
    /// Request executed
    RequestExecuted,
    /// Request rejected with an error response
    RequestRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DatabaseOpened => "DATABASE_OPENED",
            Event::Serving => "FLIGHTSEQ_SERVING",

            Event::WalReplayed => "WAL_REPLAY_COMPLETE",
            Event::ConsistencyVerified => "VERIFICATION_COMPLETE",
            Event::WalCorruption => "WAL_CORRUPTION",
            Event::RecoveryFailed => "RECOVERY_FAILED",

            Event::TxnCommit => "TXN_COMMIT",
            Event::TxnRollback => "TXN_ROLLBACK",
            Event::FaultInjected => "FAULT_INJECTED",

            Event::OrderInsert => "ORDER_INSERT",
            Event::OrderRemove => "ORDER_REMOVE",

            Event::SequenceLoaded => "SEQUENCE_LOADED",
            Event::SequenceConflict => "SEQUENCE_CONFLICT",
            Event::NodeInserted => "NODE_INSERTED",
            Event::NodeExtracted => "NODE_EXTRACTED",

            Event::FlightCreated => "FLIGHT_CREATED",
            Event::FlightDeleted => "FLIGHT_DELETED",

            Event::RequestExecuted => "REQUEST_COMPLETE",
            Event::RequestRejected => "REQUEST_REJECTED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::WalCorruption | Event::RecoveryFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
