//! Order maintenance
//!
//! Two layers:
//!
//! - `OrderRegistry`: the persisted order, positions always exactly `1..=N`
//! - `SequenceView`: an ephemeral linked list built from one registry read,
//!   offering first/last/nth access and insert/extract operations that
//!   write through to the registry
//!
//! ```ignore
//! let registry = OrderRegistry::new(&db);
//! let flights = FlightStore::new(&db);
//! let mut view = SequenceView::load(registry, &flights)?;
//! let x = flights.find("X")?;
//! view.insert_front(x)?;
//! println!("{}", view); // START <-> X <-> ... <-> END
//! ```

mod errors;
mod node;
mod record;
mod registry;
mod view;

pub use errors::{SequenceError, SequenceResult};
pub use node::NodeHandle;
pub use record::{RecordStore, SequenceRecord};
pub use registry::OrderRegistry;
pub use view::{Iter, SequenceView};
