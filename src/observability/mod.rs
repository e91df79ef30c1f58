//! Observability subsystem
//!
//! - Structured JSON line logging on stderr
//! - Typed lifecycle events
//! - Scope-based begin/complete logging
//!
//! Observability is read-only: it never changes the outcome of the
//! operation it describes.
//!
//! ```ignore
//! use flightseq::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::TxnCommit, &[("sequence", "42")]);
//!
//! let scope = ObservationScope::new("RECOVERY");
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
