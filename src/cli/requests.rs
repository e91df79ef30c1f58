//! Request handling
//!
//! One JSON object per request, tagged by `op`. Every request works on a
//! fresh `SequenceView` loaded from the registry; nothing is cached between
//! requests.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::flights::{Flight, FlightError, FlightStore, NewFlight};
use crate::observability::{Event, Logger};
use crate::order::{OrderRegistry, SequenceError, SequenceView};
use crate::storage::Database;

use super::io::{error_response, ok_response};

/// A request read from stdin
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateFlight(NewFlight),
    DeleteFlight { code: String },
    GetFlight { code: String },
    ListFlights,
    Sequence,
    First,
    Last,
    Length,
    Nth { index: usize },
    InsertFront { code: String },
    InsertEnd { code: String },
    /// Insert `code` before the flight `before`
    InsertBefore { code: String, before: String },
    Extract { code: String },
}

impl Request {
    /// Wire name of the operation
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateFlight(_) => "create_flight",
            Request::DeleteFlight { .. } => "delete_flight",
            Request::GetFlight { .. } => "get_flight",
            Request::ListFlights => "list_flights",
            Request::Sequence => "sequence",
            Request::First => "first",
            Request::Last => "last",
            Request::Length => "length",
            Request::Nth { .. } => "nth",
            Request::InsertFront { .. } => "insert_front",
            Request::InsertEnd { .. } => "insert_end",
            Request::InsertBefore { .. } => "insert_before",
            Request::Extract { .. } => "extract",
        }
    }
}

/// Error half of a response
#[derive(Debug)]
struct Rejection {
    code: &'static str,
    http_status: u16,
    message: String,
}

impl From<SequenceError> for Rejection {
    fn from(e: SequenceError) -> Self {
        Self {
            code: e.code(),
            http_status: e.status_code(),
            message: e.to_string(),
        }
    }
}

impl From<FlightError> for Rejection {
    fn from(e: FlightError) -> Self {
        Self {
            code: e.code(),
            http_status: e.status_code(),
            message: e.to_string(),
        }
    }
}

/// Parse and execute one raw request line, returning the response object
pub fn handle_line(db: &Database, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            let message = format!("Invalid request: {}", e);
            Logger::warn(
                Event::RequestRejected.as_str(),
                &[("code", "INVALID_REQUEST"), ("reason", &message)],
            );
            return error_response("INVALID_REQUEST", 400, &message);
        }
    };
    handle(db, request)
}

/// Execute one request, returning the response object
pub fn handle(db: &Database, request: Request) -> Value {
    let op = request.op();
    match execute(db, request) {
        Ok(data) => {
            Logger::info(Event::RequestExecuted.as_str(), &[("op", op)]);
            ok_response(data)
        }
        Err(rejection) => {
            Logger::warn(
                Event::RequestRejected.as_str(),
                &[
                    ("code", rejection.code),
                    ("op", op),
                    ("reason", &rejection.message),
                ],
            );
            error_response(rejection.code, rejection.http_status, &rejection.message)
        }
    }
}

fn execute(db: &Database, request: Request) -> Result<Value, Rejection> {
    let flights = FlightStore::new(db);
    let registry = OrderRegistry::new(db);

    let data = match request {
        Request::CreateFlight(input) => flight_json(&flights.create(input)?),
        Request::DeleteFlight { code } => {
            flights.delete(&code)?;
            json!({ "deleted": code })
        }
        Request::GetFlight { code } => flight_json(&flights.find(&code)?),
        Request::ListFlights => Value::Array(flights.list().iter().map(flight_json).collect()),
        Request::Sequence => {
            let view = SequenceView::load(registry, &flights)?;
            json!({
                "length": view.len(),
                "flights": view.iter().map(flight_json).collect::<Vec<_>>(),
                "display": view.to_string(),
            })
        }
        Request::First => {
            let view = SequenceView::load(registry, &flights)?;
            view.first().map(flight_json).unwrap_or(Value::Null)
        }
        Request::Last => {
            let view = SequenceView::load(registry, &flights)?;
            view.last().map(flight_json).unwrap_or(Value::Null)
        }
        Request::Length => {
            let view = SequenceView::load(registry, &flights)?;
            json!({ "length": view.len() })
        }
        Request::Nth { index } => {
            let view = SequenceView::load(registry, &flights)?;
            let node = view.node_at(index)?;
            flight_json(view.record(node)?)
        }
        Request::InsertFront { code } => {
            let mut view = SequenceView::load(registry, &flights)?;
            let flight = flights.find(&code)?;
            view.insert_front(flight)?;
            placed(&registry, &code)
        }
        Request::InsertEnd { code } => {
            let mut view = SequenceView::load(registry, &flights)?;
            let flight = flights.find(&code)?;
            view.insert_end(flight)?;
            placed(&registry, &code)
        }
        Request::InsertBefore { code, before } => {
            let mut view = SequenceView::load(registry, &flights)?;
            let reference = view.find(&before).ok_or_else(|| {
                SequenceError::NotFound(format!("'{}' is not in the sequence", before))
            })?;
            let flight = flights.find(&code)?;
            view.insert_before(flight, reference)?;
            placed(&registry, &code)
        }
        Request::Extract { code } => {
            let mut view = SequenceView::load(registry, &flights)?;
            let node = view.find(&code).ok_or_else(|| {
                SequenceError::NotFound(format!("'{}' is not in the sequence", code))
            })?;
            flight_json(&view.extract(node)?)
        }
    };

    Ok(data)
}

fn flight_json(flight: &Flight) -> Value {
    json!({
        "code": flight.code,
        "status": flight.status.as_str(),
        "departure": flight.departure.format("%Y-%m-%dT%H:%M").to_string(),
        "origin": flight.origin,
        "destination": flight.destination,
    })
}

fn placed(registry: &OrderRegistry<'_>, code: &str) -> Value {
    json!({
        "code": code,
        "position": registry.position_of(code),
    })
}
