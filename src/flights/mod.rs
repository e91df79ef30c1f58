//! Flight records
//!
//! The records the sequence orders. Creation validates the code, the status
//! and the departure timestamp; deletion is refused while the flight is in
//! the sequence.

mod errors;
mod record;
mod store;

pub use errors::{FlightError, FlightResult};
pub use record::{Flight, FlightStatus, NewFlight, MAX_CODE_LEN};
pub use store::FlightStore;
